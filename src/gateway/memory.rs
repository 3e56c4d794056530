// src/gateway/memory.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::models::auth::{
    AuthEvent, AuthSession, Credentials, MemberRole, Membership, NewUserProfile,
    OrganizationMember, SignUpData, User, UserMetadata,
};
use crate::models::inventory::{
    Category, Location, NewSupplier, ProductInsert, ProductPatch, ProductRecord, Supplier,
};
use crate::models::tenancy::{Branch, NewBranch, NewOrganization, Organization};

use super::remote::{RemoteError, RemoteGateway};
use super::session::{AuthEventSource, SessionProvider};

// ---
// 1. MemoryGateway (armazenamento remoto em memória)
// ---
// Implementação de referência do RemoteGateway: tabelas em memória com
// as mesmas regras de escopo e ordenação do armazenamento real, mais
// controles de falha e de atraso para os testes.

#[derive(Debug, Clone)]
struct MembershipRow {
    organization_id: Uuid,
    user_id: Uuid,
    role: MemberRole,
}

#[derive(Default)]
struct Tables {
    organizations: Vec<Organization>,
    branches: Vec<Branch>,
    memberships: Vec<MembershipRow>,
    profiles: Vec<NewUserProfile>,
    products: Vec<ProductRecord>,
    categories: Vec<Category>,
    suppliers: Vec<Supplier>,
    locations: Vec<Location>,
}

#[derive(Default)]
pub struct MemoryGateway {
    tables: RwLock<Tables>,
    calls: Mutex<Vec<&'static str>>,
    fail_next: Mutex<HashMap<&'static str, String>>,
    holds: Mutex<HashMap<&'static str, Arc<Notify>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Controles de teste ---

    // Programa a PRÓXIMA chamada de `op` para falhar com esta mensagem.
    pub fn fail_next(&self, op: &'static str, message: &str) {
        self.fail_next.lock().insert(op, message.to_string());
    }

    // Segura as chamadas de `op` até alguém chamar `release`.
    pub fn hold(&self, op: &'static str) {
        self.holds.lock().insert(op, Arc::new(Notify::new()));
    }

    // Libera o hold: acorda quem já espera e deixa um aviso para uma
    // chamada que tenha pego o hold mas ainda não registrado a espera.
    pub fn release(&self, op: &'static str) {
        if let Some(notify) = self.holds.lock().remove(op) {
            notify.notify_waiters();
            notify.notify_one();
        }
    }

    // Nomes das operações já chamadas, na ordem de chegada.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, op: &'static str) -> usize {
        self.calls.lock().iter().filter(|name| **name == op).count()
    }

    // Registra a chamada, respeita um hold pendente e consome uma falha
    // programada, nessa ordem.
    async fn gate(&self, op: &'static str) -> Result<(), RemoteError> {
        self.calls.lock().push(op);
        let hold = self.holds.lock().get(op).cloned();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        if let Some(message) = self.fail_next.lock().remove(op) {
            return Err(RemoteError::new(message));
        }
        Ok(())
    }

    // --- Semeadura (estado inicial dos testes e da demo) ---

    pub fn seed_organization(&self, name: &str, owner_id: Uuid) -> Organization {
        let organization = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id,
            settings: Default::default(),
            created_at: Utc::now(),
        };
        self.tables.write().organizations.push(organization.clone());
        organization
    }

    pub fn seed_branch(&self, organization_id: Uuid, name: &str) -> Branch {
        let branch = Branch {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
            address: String::new(),
            manager_id: None,
            created_at: Utc::now(),
        };
        self.tables.write().branches.push(branch.clone());
        branch
    }

    pub fn seed_membership(&self, organization_id: Uuid, user_id: Uuid, role: MemberRole) {
        self.tables.write().memberships.push(MembershipRow {
            organization_id,
            user_id,
            role,
        });
    }

    pub fn seed_product(&self, data: ProductInsert) -> ProductRecord {
        let record = ProductRecord {
            id: Uuid::new_v4(),
            organization_id: data.organization_id,
            branch_id: data.branch_id,
            name: data.name,
            sku: data.sku,
            category: data.category,
            supplier: data.supplier,
            location: data.location,
            quantity: data.quantity,
            price: data.price,
            min_stock: data.min_stock,
            created_at: Utc::now(),
        };
        self.tables.write().products.push(record.clone());
        record
    }

    pub fn seed_category(&self, organization_id: Uuid, name: &str) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
        };
        self.tables.write().categories.push(category.clone());
        category
    }

    pub fn seed_supplier(&self, organization_id: Uuid, name: &str) -> Supplier {
        let supplier = Supplier {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
            contact: None,
        };
        self.tables.write().suppliers.push(supplier.clone());
        supplier
    }

    pub fn seed_location(&self, branch_id: Uuid, name: &str) -> Location {
        let location = Location {
            id: Uuid::new_v4(),
            branch_id,
            name: name.to_string(),
        };
        self.tables.write().locations.push(location.clone());
        location
    }

    // --- Inspeção (contagens usadas pelos testes de compensação) ---

    pub fn organization_count(&self) -> usize {
        self.tables.read().organizations.len()
    }

    pub fn branch_count(&self) -> usize {
        self.tables.read().branches.len()
    }

    pub fn membership_count(&self) -> usize {
        self.tables.read().memberships.len()
    }

    pub fn profile_count(&self) -> usize {
        self.tables.read().profiles.len()
    }

    pub fn product_count(&self) -> usize {
        self.tables.read().products.len()
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn fetch_products(&self, branch_id: Uuid) -> Result<Vec<ProductRecord>, RemoteError> {
        self.gate("fetch_products").await?;
        let mut products: Vec<ProductRecord> = self
            .tables
            .read()
            .products
            .iter()
            .filter(|product| product.branch_id == branch_id)
            .cloned()
            .collect();
        // Mais recentes primeiro, como o armazenamento real devolve.
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn fetch_categories(&self, organization_id: Uuid) -> Result<Vec<Category>, RemoteError> {
        self.gate("fetch_categories").await?;
        let mut categories: Vec<Category> = self
            .tables
            .read()
            .categories
            .iter()
            .filter(|category| category.organization_id == organization_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn fetch_suppliers(&self, organization_id: Uuid) -> Result<Vec<Supplier>, RemoteError> {
        self.gate("fetch_suppliers").await?;
        let mut suppliers: Vec<Supplier> = self
            .tables
            .read()
            .suppliers
            .iter()
            .filter(|supplier| supplier.organization_id == organization_id)
            .cloned()
            .collect();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }

    async fn fetch_locations(&self, branch_id: Uuid) -> Result<Vec<Location>, RemoteError> {
        self.gate("fetch_locations").await?;
        let mut locations: Vec<Location> = self
            .tables
            .read()
            .locations
            .iter()
            .filter(|location| location.branch_id == branch_id)
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    async fn create_product(&self, data: ProductInsert) -> Result<ProductRecord, RemoteError> {
        self.gate("create_product").await?;
        Ok(self.seed_product(data))
    }

    async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<ProductRecord, RemoteError> {
        self.gate("update_product").await?;
        let mut tables = self.tables.write();
        let product = tables
            .products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| RemoteError::new("Produto não encontrado."))?;
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(sku) = patch.sku {
            product.sku = sku;
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(supplier) = patch.supplier {
            product.supplier = supplier;
        }
        if let Some(location) = patch.location {
            product.location = location;
        }
        if let Some(quantity) = patch.quantity {
            product.quantity = quantity;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(min_stock) = patch.min_stock {
            product.min_stock = min_stock;
        }
        Ok(product.clone())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RemoteError> {
        self.gate("delete_product").await?;
        self.tables.write().products.retain(|product| product.id != id);
        Ok(())
    }

    async fn update_product_quantity(
        &self,
        id: Uuid,
        quantity: u32,
    ) -> Result<ProductRecord, RemoteError> {
        self.gate("update_product_quantity").await?;
        let mut tables = self.tables.write();
        let product = tables
            .products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| RemoteError::new("Produto não encontrado."))?;
        product.quantity = quantity;
        Ok(product.clone())
    }

    async fn create_category(
        &self,
        name: &str,
        organization_id: Uuid,
    ) -> Result<Category, RemoteError> {
        self.gate("create_category").await?;
        let duplicated = self.tables.read().categories.iter().any(|category| {
            category.organization_id == organization_id && category.name == name
        });
        if duplicated {
            return Err(RemoteError::new("Já existe uma categoria com este nome."));
        }
        Ok(self.seed_category(organization_id, name))
    }

    async fn create_supplier(
        &self,
        data: NewSupplier,
        organization_id: Uuid,
    ) -> Result<Supplier, RemoteError> {
        self.gate("create_supplier").await?;
        let duplicated = self.tables.read().suppliers.iter().any(|supplier| {
            supplier.organization_id == organization_id && supplier.name == data.name
        });
        if duplicated {
            return Err(RemoteError::new("Já existe um fornecedor com este nome."));
        }
        let supplier = Supplier {
            id: Uuid::new_v4(),
            organization_id,
            name: data.name,
            contact: data.contact,
        };
        self.tables.write().suppliers.push(supplier.clone());
        Ok(supplier)
    }

    async fn fetch_memberships(&self, user_id: Uuid) -> Result<Vec<Membership>, RemoteError> {
        self.gate("fetch_memberships").await?;
        let tables = self.tables.read();
        let memberships = tables
            .memberships
            .iter()
            .filter(|row| row.user_id == user_id)
            .filter_map(|row| {
                tables
                    .organizations
                    .iter()
                    .find(|organization| organization.id == row.organization_id)
                    .map(|organization| Membership {
                        organization: organization.clone(),
                        role: row.role,
                    })
            })
            .collect();
        Ok(memberships)
    }

    async fn fetch_branches(&self, organization_id: Uuid) -> Result<Vec<Branch>, RemoteError> {
        self.gate("fetch_branches").await?;
        let mut branches: Vec<Branch> = self
            .tables
            .read()
            .branches
            .iter()
            .filter(|branch| branch.organization_id == organization_id)
            .cloned()
            .collect();
        // Ordem alfabética: a primeira é a candidata à auto-seleção.
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn create_organization(
        &self,
        data: NewOrganization,
    ) -> Result<Organization, RemoteError> {
        self.gate("create_organization").await?;
        let organization = Organization {
            id: Uuid::new_v4(),
            name: data.name,
            owner_id: data.owner_id,
            settings: data.settings,
            created_at: Utc::now(),
        };
        self.tables.write().organizations.push(organization.clone());
        Ok(organization)
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), RemoteError> {
        self.gate("delete_organization").await?;
        self.tables
            .write()
            .organizations
            .retain(|organization| organization.id != id);
        Ok(())
    }

    async fn create_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), RemoteError> {
        self.gate("create_membership").await?;
        self.tables.write().memberships.push(MembershipRow {
            organization_id,
            user_id,
            role,
        });
        Ok(())
    }

    async fn delete_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), RemoteError> {
        self.gate("delete_membership").await?;
        self.tables.write().memberships.retain(|row| {
            !(row.organization_id == organization_id && row.user_id == user_id)
        });
        Ok(())
    }

    async fn create_branch(&self, data: NewBranch) -> Result<Branch, RemoteError> {
        self.gate("create_branch").await?;
        let branch = Branch {
            id: Uuid::new_v4(),
            organization_id: data.organization_id,
            name: data.name,
            address: data.address,
            manager_id: data.manager_id,
            created_at: Utc::now(),
        };
        self.tables.write().branches.push(branch.clone());
        Ok(branch)
    }

    async fn delete_branch(&self, id: Uuid) -> Result<(), RemoteError> {
        self.gate("delete_branch").await?;
        self.tables.write().branches.retain(|branch| branch.id != id);
        Ok(())
    }

    async fn create_user_profile(&self, data: NewUserProfile) -> Result<(), RemoteError> {
        self.gate("create_user_profile").await?;
        self.tables.write().profiles.push(data);
        Ok(())
    }

    async fn fetch_organization_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>, RemoteError> {
        self.gate("fetch_organization_members").await?;
        let tables = self.tables.read();
        let members = tables
            .memberships
            .iter()
            .filter(|row| row.organization_id == organization_id)
            .map(|row| {
                let profile = tables
                    .profiles
                    .iter()
                    .find(|profile| profile.user_id == row.user_id);
                OrganizationMember {
                    user_id: row.user_id,
                    full_name: profile.map(|profile| profile.full_name.clone()),
                    avatar_url: profile.and_then(|profile| profile.avatar_url.clone()),
                    role: row.role,
                }
            })
            .collect();
        Ok(members)
    }

    async fn update_member_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), RemoteError> {
        self.gate("update_member_role").await?;
        let mut tables = self.tables.write();
        let row = tables
            .memberships
            .iter_mut()
            .find(|row| row.organization_id == organization_id && row.user_id == user_id)
            .ok_or_else(|| RemoteError::new("Vínculo de membro não encontrado."))?;
        row.role = role;
        Ok(())
    }
}

// ---
// 2. MemoryProvider (provedor de sessão em memória)
// ---
// Contrapartida do provedor de autenticação real: contas com senha em
// texto plano (é um duble de teste), sessão corrente e a fonte de
// eventos compartilhada.

struct Account {
    email: String,
    password: String,
    user: User,
}

pub struct MemoryProvider {
    accounts: RwLock<Vec<Account>>,
    session: RwLock<Option<AuthSession>>,
    events: Arc<AuthEventSource>,
    fail_next: Mutex<HashMap<&'static str, String>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            session: RwLock::new(None),
            events: AuthEventSource::new(),
            fail_next: Mutex::new(HashMap::new()),
        }
    }

    // Provedor já com uma sessão ativa, para exercitar o resume.
    pub fn with_session(user: User) -> Self {
        let provider = Self::new();
        *provider.session.write() = Some(AuthSession { user });
        provider
    }

    pub fn register_account(&self, email: &str, password: &str, full_name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            metadata: UserMetadata {
                full_name: Some(full_name.to_string()),
            },
        };
        self.accounts.write().push(Account {
            email: email.to_string(),
            password: password.to_string(),
            user: user.clone(),
        });
        user
    }

    pub fn fail_next(&self, op: &'static str, message: &str) {
        self.fail_next.lock().insert(op, message.to_string());
    }

    fn take_failure(&self, op: &'static str) -> Option<String> {
        self.fail_next.lock().remove(op)
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionProvider for MemoryProvider {
    async fn current_session(&self) -> Result<Option<AuthSession>, RemoteError> {
        if let Some(message) = self.take_failure("current_session") {
            return Err(RemoteError::new(message));
        }
        Ok(self.session.read().clone())
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, RemoteError> {
        if let Some(message) = self.take_failure("sign_in") {
            return Err(RemoteError::new(message));
        }
        let user = self
            .accounts
            .read()
            .iter()
            .find(|account| {
                account.email == credentials.email && account.password == credentials.password
            })
            .map(|account| account.user.clone());
        let Some(user) = user else {
            return Err(RemoteError::new("E-mail ou senha inválidos."));
        };
        let session = AuthSession { user };
        *self.session.write() = Some(session.clone());
        self.events.emit(AuthEvent::SignedIn(session.clone())).await;
        Ok(session)
    }

    async fn sign_up(&self, data: &SignUpData) -> Result<AuthSession, RemoteError> {
        if let Some(message) = self.take_failure("sign_up") {
            return Err(RemoteError::new(message));
        }
        let duplicated = self
            .accounts
            .read()
            .iter()
            .any(|account| account.email == data.email);
        if duplicated {
            return Err(RemoteError::new("Este e-mail já está em uso."));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: data.email.clone(),
            metadata: UserMetadata {
                full_name: Some(data.full_name.clone()),
            },
        };
        self.accounts.write().push(Account {
            email: data.email.clone(),
            password: data.password.clone(),
            user: user.clone(),
        });
        let session = AuthSession { user };
        *self.session.write() = Some(session.clone());
        // O evento de login do cadastro fica a cargo de quem chamou,
        // depois que a montagem da conta terminar.
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        if let Some(message) = self.take_failure("sign_out") {
            return Err(RemoteError::new(message));
        }
        *self.session.write() = None;
        self.events.emit(AuthEvent::SignedOut).await;
        Ok(())
    }

    fn events(&self) -> Arc<AuthEventSource> {
        Arc::clone(&self.events)
    }
}
