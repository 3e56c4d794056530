// src/models/inventory.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- 1. Status de Estoque ---
// Sempre derivado de quantidade + estoque mínimo, nunca lido do registro
// remoto. Esta função é o único ponto do código que faz esse cálculo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl StockStatus {
    pub fn derive(quantity: u32, min_stock: u32) -> Self {
        if quantity == 0 {
            StockStatus::OutOfStock
        } else if quantity <= min_stock {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        };
        write!(f, "{}", label)
    }
}

// --- 2. Produto ---

// Registro bruto, do jeito que o gateway devolve: sem status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub supplier: String,
    pub location: String,
    pub quantity: u32,
    pub price: Decimal,
    pub min_stock: u32,
    pub created_at: DateTime<Utc>,
}

// Produto enriquecido, como o estado local o mantém.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub supplier: String,
    pub location: String,
    pub quantity: u32,
    pub price: Decimal,
    pub min_stock: u32,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    // Todo registro vindo de fora passa por aqui antes de entrar no estado.
    pub fn from_record(record: ProductRecord) -> Self {
        let status = StockStatus::derive(record.quantity, record.min_stock);
        Self {
            id: record.id,
            organization_id: record.organization_id,
            branch_id: record.branch_id,
            name: record.name,
            sku: record.sku,
            category: record.category,
            supplier: record.supplier,
            location: record.location,
            quantity: record.quantity,
            price: record.price,
            min_stock: record.min_stock,
            status,
            created_at: record.created_at,
        }
    }

    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

// --- 3. Payloads de Produto ---

fn validate_not_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut error = ValidationError::new("negative_value");
        error.message = Some("O preço não pode ser negativo.".into());
        return Err(error);
    }
    Ok(())
}

// Rascunho do formulário: ainda sem ids de escopo.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[validate(length(min = 1, message = "O nome do produto é obrigatório."))]
    pub name: String,
    #[validate(length(min = 1, message = "O SKU é obrigatório."))]
    pub sku: String,
    #[validate(length(min = 1, message = "A categoria é obrigatória."))]
    pub category: String,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub quantity: u32,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub min_stock: u32,
}

// O que o gateway recebe para criar: rascunho + escopo resolvido.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInsert {
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub supplier: String,
    pub location: String,
    pub quantity: u32,
    pub price: Decimal,
    pub min_stock: u32,
}

impl ProductInsert {
    pub fn from_draft(draft: NewProduct, organization_id: Uuid, branch_id: Uuid) -> Self {
        Self {
            organization_id,
            branch_id,
            name: draft.name,
            sku: draft.sku,
            category: draft.category,
            supplier: draft.supplier,
            location: draft.location,
            quantity: draft.quantity,
            price: draft.price,
            min_stock: draft.min_stock,
        }
    }
}

// Atualização parcial: só os campos presentes são enviados.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<u32>,
}

// --- 4. Catálogos da Organização e da Filial ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    #[validate(length(min = 1, message = "O nome do fornecedor é obrigatório."))]
    pub name: String,
    pub contact: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_derivation_covers_all_bands() {
        assert_eq!(StockStatus::derive(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::derive(0, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::derive(3, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(6, 5), StockStatus::InStock);
        assert_eq!(StockStatus::derive(1, 0), StockStatus::InStock);
    }

    #[test]
    fn draft_requires_name_sku_and_category() {
        let draft = NewProduct {
            name: String::new(),
            sku: String::new(),
            category: String::new(),
            supplier: String::new(),
            location: String::new(),
            quantity: 0,
            price: Decimal::ZERO,
            min_stock: 0,
        };

        let errors = draft.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("sku"));
        assert!(fields.contains_key("category"));
    }

    #[test]
    fn draft_rejects_negative_price() {
        let draft = NewProduct {
            name: "Café".to_string(),
            sku: "CAF-01".to_string(),
            category: "Bebidas".to_string(),
            supplier: String::new(),
            location: String::new(),
            quantity: 1,
            price: Decimal::new(-100, 2),
            min_stock: 0,
        };

        let errors = draft.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
    }
}
