// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---
// 1. Organization (A "Conta")
// ---
// A conta principal, dona de filiais, categorias e fornecedores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub settings: OrganizationSettings,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSettings {
    pub timezone: String,
    pub currency: String,
    pub date_format: String,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            currency: "USD".to_string(),
            date_format: "YYYY-MM-DD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    pub owner_id: Uuid,
    pub settings: OrganizationSettings,
}

// ---
// 2. Branch (A "Filial")
// ---
// O local físico do estoque. Produtos e locais pertencem a uma filial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub address: String,
    pub manager_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBranch {
    pub organization_id: Uuid,
    pub name: String,
    pub address: String,
    pub manager_id: Option<Uuid>,
}

// ---
// 3. TenantScope (O "Escopo Ativo")
// ---
// Par (organização, filial) derivado da sessão. Transitório: nunca é
// persistido, sempre recalculado do estado da sessão.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantScope {
    pub organization_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}

impl TenantScope {
    pub fn new(organization_id: Option<Uuid>, branch_id: Option<Uuid>) -> Self {
        Self {
            organization_id,
            branch_id,
        }
    }

    // Cargas de inventário só acontecem com o par completo.
    pub fn is_complete(&self) -> bool {
        self.organization_id.is_some() && self.branch_id.is_some()
    }

    pub fn ids(&self) -> Option<(Uuid, Uuid)> {
        match (self.organization_id, self.branch_id) {
            (Some(organization_id), Some(branch_id)) => Some((organization_id, branch_id)),
            _ => None,
        }
    }
}
