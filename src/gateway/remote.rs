// src/gateway/remote.rs

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{MemberRole, Membership, NewUserProfile, OrganizationMember};
use crate::models::inventory::{
    Category, Location, NewSupplier, ProductInsert, ProductPatch, ProductRecord, Supplier,
};
use crate::models::tenancy::{Branch, NewBranch, NewOrganization, Organization};

// Falha de uma chamada remota. A mensagem é legível para o usuário;
// o núcleo não tenta de novo nem grava nada pela metade.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// A fronteira com o armazenamento remoto. Toda consulta é limitada
// por organização ou filial; os registros voltam crus, sem status.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    // --- Inventário: consultas escopadas ---
    async fn fetch_products(&self, branch_id: Uuid) -> Result<Vec<ProductRecord>, RemoteError>;
    async fn fetch_categories(&self, organization_id: Uuid) -> Result<Vec<Category>, RemoteError>;
    async fn fetch_suppliers(&self, organization_id: Uuid) -> Result<Vec<Supplier>, RemoteError>;
    async fn fetch_locations(&self, branch_id: Uuid) -> Result<Vec<Location>, RemoteError>;

    // --- Inventário: mutações (devolvem o registro persistido) ---
    async fn create_product(&self, data: ProductInsert) -> Result<ProductRecord, RemoteError>;
    async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<ProductRecord, RemoteError>;
    async fn delete_product(&self, id: Uuid) -> Result<(), RemoteError>;
    async fn update_product_quantity(
        &self,
        id: Uuid,
        quantity: u32,
    ) -> Result<ProductRecord, RemoteError>;
    async fn create_category(
        &self,
        name: &str,
        organization_id: Uuid,
    ) -> Result<Category, RemoteError>;
    async fn create_supplier(
        &self,
        data: NewSupplier,
        organization_id: Uuid,
    ) -> Result<Supplier, RemoteError>;

    // --- Sessão: organizações, filiais, vínculos e perfis ---
    async fn fetch_memberships(&self, user_id: Uuid) -> Result<Vec<Membership>, RemoteError>;
    async fn fetch_branches(&self, organization_id: Uuid) -> Result<Vec<Branch>, RemoteError>;
    async fn create_organization(
        &self,
        data: NewOrganization,
    ) -> Result<Organization, RemoteError>;
    async fn delete_organization(&self, id: Uuid) -> Result<(), RemoteError>;
    async fn create_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), RemoteError>;
    async fn delete_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), RemoteError>;
    async fn create_branch(&self, data: NewBranch) -> Result<Branch, RemoteError>;
    async fn delete_branch(&self, id: Uuid) -> Result<(), RemoteError>;
    async fn create_user_profile(&self, data: NewUserProfile) -> Result<(), RemoteError>;
    async fn fetch_organization_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>, RemoteError>;
    async fn update_member_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), RemoteError>;
}
