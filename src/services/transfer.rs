// src/services/transfer.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::notify::NotificationSink;
use crate::models::inventory::{Category, Location, Product, Supplier};
use crate::models::transfer::{ExportPayload, ImportPayload};
use crate::services::inventory::{InventoryAction, InventoryStore};

// Backup e restauração do inventário do escopo ativo.
#[derive(Clone)]
pub struct TransferService {
    store: Arc<InventoryStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl TransferService {
    pub fn new(store: Arc<InventoryStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, notifier }
    }

    // Monta o payload de backup a partir do estado atual.
    pub fn export_data(&self) -> ExportPayload {
        let state = self.store.snapshot();
        ExportPayload {
            products: state.products,
            categories: state
                .categories
                .into_iter()
                .map(|category| category.name)
                .collect(),
            suppliers: state
                .suppliers
                .into_iter()
                .map(|supplier| supplier.name)
                .collect(),
            locations: state
                .locations
                .into_iter()
                .map(|location| location.name)
                .collect(),
            export_date: Utc::now(),
        }
    }

    pub fn export_json(&self) -> Result<String, AppError> {
        let payload = self.export_data();
        let json = serde_json::to_string_pretty(&payload)
            .map_err(|error| anyhow::anyhow!("falha ao serializar o backup: {}", error))?;
        Ok(json)
    }

    pub fn import_json(&self, raw: &str) -> Result<(), AppError> {
        let payload: ImportPayload = serde_json::from_str(raw)
            .map_err(|error| AppError::InvalidImportPayload(error.to_string()))?;
        self.import_data(payload)
    }

    // A restauração é tudo-ou-nada: qualquer rejeição acontece antes de
    // o estado ser tocado.
    pub fn import_data(&self, payload: ImportPayload) -> Result<(), AppError> {
        if let Some(exported) = payload.export_date {
            tracing::debug!("importando backup gerado em {}", exported);
        }
        let (Some(products), Some(categories)) = (payload.products, payload.categories) else {
            return Err(AppError::InvalidImportPayload(
                "as chaves 'products' e 'categories' são obrigatórias".to_string(),
            ));
        };

        let scope = self.store.scope();
        let Some((organization_id, branch_id)) = scope.ids() else {
            return Err(match scope.organization_id {
                None => AppError::NoOrganizationSelected,
                Some(_) => AppError::NoBranchSelected,
            });
        };

        // Tudo renasce sob o escopo ativo: nomes viram linhas novas e os
        // produtos recebem o par (organização, filial) corrente. O status
        // é rederivado, nunca aproveitado do arquivo.
        let products: Vec<Product> = products
            .into_iter()
            .map(|mut record| {
                record.organization_id = organization_id;
                record.branch_id = branch_id;
                Product::from_record(record)
            })
            .collect();
        let categories: Vec<Category> = categories
            .into_iter()
            .map(|name| Category {
                id: Uuid::new_v4(),
                organization_id,
                name,
            })
            .collect();
        let suppliers: Vec<Supplier> = payload
            .suppliers
            .into_iter()
            .map(|name| Supplier {
                id: Uuid::new_v4(),
                organization_id,
                name,
                contact: None,
            })
            .collect();
        let locations: Vec<Location> = payload
            .locations
            .into_iter()
            .map(|name| Location {
                id: Uuid::new_v4(),
                branch_id,
                name,
            })
            .collect();

        self.store.dispatch(InventoryAction::ReplaceAll {
            products,
            categories,
            suppliers,
            locations,
        });
        self.notifier.notify_success("Dados importados com sucesso!");
        Ok(())
    }
}
