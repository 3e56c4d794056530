// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::inventory::StockStatus;

// 1. Resumo do Inventário (Os Cards do Topo)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_products: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub total_value: Decimal, // Soma de quantidade × preço
}

// 2. Distribuição por Categoria
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub name: String,
    pub product_count: usize,
    pub total_value: Decimal,
}

// 3. Distribuição por Status
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub status: StockStatus,
    pub count: usize,
}

// 4. Curva ABC (Top Produtos por valor em estoque)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub stock_value: Decimal,
}
