// src/models/transfer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::inventory::{Product, ProductRecord};

// A forma do arquivo de backup exportado.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub products: Vec<Product>,
    pub categories: Vec<String>,
    pub suppliers: Vec<String>,
    pub locations: Vec<String>,
    pub export_date: DateTime<Utc>,
}

// Payload de importação. `products` e `categories` são opcionais de
// propósito: a ausência da chave é o que invalida o arquivo, antes de
// qualquer mudança de estado. O status que vier no JSON é ignorado.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPayload {
    pub products: Option<Vec<ProductRecord>>,
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub suppliers: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub export_date: Option<DateTime<Utc>>,
}
