// src/services/inventory.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::{AppError, field_error};
use crate::common::notify::NotificationSink;
use crate::gateway::{RemoteError, RemoteGateway};
use crate::models::inventory::{
    Category, Location, NewProduct, NewSupplier, Product, ProductInsert, ProductPatch,
    StockStatus, Supplier,
};
use crate::models::tenancy::TenantScope;

// ---
// 1. Estado e Ações
// ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryState {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub suppliers: Vec<Supplier>,
    pub locations: Vec<Location>,
    pub loading: bool,
    pub error: Option<String>,
}

// Uma transição por variante. Toda escrita no estado passa por `apply`;
// nenhum outro código mexe nas fatias.
#[derive(Debug, Clone)]
pub enum InventoryAction {
    SetLoading(bool),
    SetError(String),
    LoadProducts(Vec<Product>),
    LoadCategories(Vec<Category>),
    LoadSuppliers(Vec<Supplier>),
    LoadLocations(Vec<Location>),
    AddProduct(Product),
    UpdateProduct(Product),
    DeleteProduct(Uuid),
    UpdateQuantity { id: Uuid, quantity: u32 },
    ReplaceAll {
        products: Vec<Product>,
        categories: Vec<Category>,
        suppliers: Vec<Supplier>,
        locations: Vec<Location>,
    },
}

// Qual fatia a ação tocou; é o que os assinantes do store recebem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Loading,
    Error,
    Products,
    Categories,
    Suppliers,
    Locations,
    Reset,
}

impl InventoryState {
    pub fn apply(&mut self, action: InventoryAction) -> StoreEvent {
        match action {
            InventoryAction::SetLoading(loading) => {
                self.loading = loading;
                StoreEvent::Loading
            }
            InventoryAction::SetError(message) => {
                self.error = Some(message);
                self.loading = false;
                StoreEvent::Error
            }
            InventoryAction::LoadProducts(products) => {
                self.products = products;
                self.loading = false;
                StoreEvent::Products
            }
            InventoryAction::LoadCategories(categories) => {
                self.categories = categories;
                StoreEvent::Categories
            }
            InventoryAction::LoadSuppliers(suppliers) => {
                self.suppliers = suppliers;
                StoreEvent::Suppliers
            }
            InventoryAction::LoadLocations(locations) => {
                self.locations = locations;
                StoreEvent::Locations
            }
            InventoryAction::AddProduct(product) => {
                self.products.push(product);
                self.loading = false;
                StoreEvent::Products
            }
            InventoryAction::UpdateProduct(product) => {
                if let Some(existing) = self
                    .products
                    .iter_mut()
                    .find(|existing| existing.id == product.id)
                {
                    *existing = product;
                }
                self.loading = false;
                StoreEvent::Products
            }
            InventoryAction::DeleteProduct(id) => {
                self.products.retain(|product| product.id != id);
                self.loading = false;
                StoreEvent::Products
            }
            InventoryAction::UpdateQuantity { id, quantity } => {
                if let Some(product) = self.products.iter_mut().find(|product| product.id == id) {
                    product.quantity = quantity;
                    // O status acompanha a quantidade, sempre.
                    product.status = StockStatus::derive(product.quantity, product.min_stock);
                }
                self.loading = false;
                StoreEvent::Products
            }
            InventoryAction::ReplaceAll {
                products,
                categories,
                suppliers,
                locations,
            } => {
                self.products = products;
                self.categories = categories;
                self.suppliers = suppliers;
                self.locations = locations;
                self.loading = false;
                StoreEvent::Reset
            }
        }
    }
}

// ---
// 2. InventoryStore
// ---
// O agregado de inventário do escopo ativo. Mutações são confirmadas:
// o gateway grava primeiro e o estado local só muda com o registro que
// voltou. Nada de escrita otimista com rollback.

pub struct InventoryStore {
    gateway: Arc<dyn RemoteGateway>,
    notifier: Arc<dyn NotificationSink>,
    state: RwLock<InventoryState>,
    scope: RwLock<TenantScope>,
    // Carimbo de validade das buscas em voo. Toda troca de escopo o
    // avança; resultados de uma geração anterior são descartados.
    generation: AtomicU64,
    events: broadcast::Sender<StoreEvent>,
}

impl InventoryStore {
    pub fn new(gateway: Arc<dyn RemoteGateway>, notifier: Arc<dyn NotificationSink>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            gateway,
            notifier,
            state: RwLock::new(InventoryState::default()),
            scope: RwLock::new(TenantScope::default()),
            generation: AtomicU64::new(0),
            events,
        }
    }

    pub fn snapshot(&self) -> InventoryState {
        self.state.read().clone()
    }

    pub fn scope(&self) -> TenantScope {
        *self.scope.read()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn dispatch(&self, action: InventoryAction) {
        let event = self.state.write().apply(action);
        // Sem assinantes também está certo; o envio só falha nesse caso.
        let _ = self.events.send(event);
    }

    // Troca de escopo: invalida as buscas em voo, zera as fatias e
    // recarrega se o novo par estiver completo.
    pub async fn on_scope_changed(&self, scope: TenantScope) {
        *self.scope.write() = scope;
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.write() = InventoryState::default();
        let _ = self.events.send(StoreEvent::Reset);
        if scope.is_complete() {
            self.reload_all().await;
        }
    }

    // Recarrega as quatro coleções de uma vez. Cada busca escreve numa
    // fatia própria, então a ordem de término entre elas não importa.
    pub async fn reload_all(&self) {
        let scope = self.scope();
        let Some((organization_id, branch_id)) = scope.ids() else {
            return; // sem par completo não há o que buscar
        };
        let generation = self.generation.load(Ordering::SeqCst);
        self.dispatch(InventoryAction::SetLoading(true));

        let (products, categories, suppliers, locations) = tokio::join!(
            self.gateway.fetch_products(branch_id),
            self.gateway.fetch_categories(organization_id),
            self.gateway.fetch_suppliers(organization_id),
            self.gateway.fetch_locations(branch_id),
        );

        // O escopo andou enquanto as buscas corriam? Então nada daqui
        // pode encostar no estado do escopo novo.
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("descartando resultado de buscas de um escopo que já mudou");
            return;
        }

        match products {
            Ok(records) => self.dispatch(InventoryAction::LoadProducts(
                records.into_iter().map(Product::from_record).collect(),
            )),
            Err(error) => self.surface(&error),
        }
        match categories {
            Ok(rows) => self.dispatch(InventoryAction::LoadCategories(rows)),
            Err(error) => self.surface(&error),
        }
        match suppliers {
            Ok(rows) => self.dispatch(InventoryAction::LoadSuppliers(rows)),
            Err(error) => self.surface(&error),
        }
        match locations {
            Ok(rows) => self.dispatch(InventoryAction::LoadLocations(rows)),
            Err(error) => self.surface(&error),
        }
    }

    // --- Mutações de produto ---

    pub async fn add_product(&self, draft: NewProduct) -> Result<Product, AppError> {
        draft.validate()?;
        let (organization_id, branch_id) = self.require_scope()?;
        self.dispatch(InventoryAction::SetLoading(true));
        let insert = ProductInsert::from_draft(draft, organization_id, branch_id);
        match self.gateway.create_product(insert).await {
            Ok(record) => {
                let product = Product::from_record(record);
                self.dispatch(InventoryAction::AddProduct(product.clone()));
                self.notifier.notify_success("Produto adicionado com sucesso!");
                Ok(product)
            }
            Err(error) => {
                self.surface(&error);
                Err(error.into())
            }
        }
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> Result<Product, AppError> {
        validate_patch(&patch)?;
        self.dispatch(InventoryAction::SetLoading(true));
        match self.gateway.update_product(id, patch).await {
            Ok(record) => {
                let product = Product::from_record(record);
                self.dispatch(InventoryAction::UpdateProduct(product.clone()));
                self.notifier.notify_success("Produto atualizado com sucesso!");
                Ok(product)
            }
            Err(error) => {
                self.surface(&error);
                Err(error.into())
            }
        }
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<(), AppError> {
        self.dispatch(InventoryAction::SetLoading(true));
        match self.gateway.delete_product(id).await {
            Ok(()) => {
                self.dispatch(InventoryAction::DeleteProduct(id));
                self.notifier.notify_success("Produto removido com sucesso!");
                Ok(())
            }
            Err(error) => {
                self.surface(&error);
                Err(error.into())
            }
        }
    }

    pub async fn update_quantity(&self, id: Uuid, quantity: u32) -> Result<Product, AppError> {
        self.dispatch(InventoryAction::SetLoading(true));
        match self.gateway.update_product_quantity(id, quantity).await {
            Ok(record) => {
                self.dispatch(InventoryAction::UpdateQuantity {
                    id,
                    quantity: record.quantity,
                });
                self.notifier.notify_success("Quantidade atualizada com sucesso!");
                Ok(Product::from_record(record))
            }
            Err(error) => {
                self.surface(&error);
                Err(error.into())
            }
        }
    }

    // --- Catálogos ---
    // Não passam pelo ciclo de loading; o nome duplicado é barrado aqui,
    // antes de o gateway ser chamado.

    pub async fn add_category(&self, name: &str) -> Result<Category, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(field_error("name", "length", "O nome da categoria é obrigatório.").into());
        }
        let organization_id = self.require_organization()?;
        let duplicated = {
            let state = self.state.read();
            state
                .categories
                .iter()
                .any(|category| category.name.to_lowercase() == name.to_lowercase())
        };
        if duplicated {
            return Err(AppError::CategoryNameAlreadyExists(name.to_string()));
        }
        match self.gateway.create_category(name, organization_id).await {
            Ok(category) => {
                let mut categories = self.snapshot().categories;
                categories.push(category.clone());
                self.dispatch(InventoryAction::LoadCategories(categories));
                self.notifier.notify_success("Categoria adicionada com sucesso!");
                Ok(category)
            }
            Err(error) => {
                self.surface(&error);
                Err(error.into())
            }
        }
    }

    pub async fn add_supplier(&self, draft: NewSupplier) -> Result<Supplier, AppError> {
        draft.validate()?;
        let organization_id = self.require_organization()?;
        let duplicated = {
            let state = self.state.read();
            state
                .suppliers
                .iter()
                .any(|supplier| supplier.name.to_lowercase() == draft.name.to_lowercase())
        };
        if duplicated {
            return Err(AppError::SupplierNameAlreadyExists(draft.name));
        }
        match self.gateway.create_supplier(draft, organization_id).await {
            Ok(supplier) => {
                let mut suppliers = self.snapshot().suppliers;
                suppliers.push(supplier.clone());
                self.dispatch(InventoryAction::LoadSuppliers(suppliers));
                self.notifier.notify_success("Fornecedor adicionado com sucesso!");
                Ok(supplier)
            }
            Err(error) => {
                self.surface(&error);
                Err(error.into())
            }
        }
    }

    // --- Guardas e apoio ---

    fn require_scope(&self) -> Result<(Uuid, Uuid), AppError> {
        let scope = self.scope();
        match (scope.organization_id, scope.branch_id) {
            (Some(organization_id), Some(branch_id)) => Ok((organization_id, branch_id)),
            (None, _) => Err(AppError::NoOrganizationSelected),
            (Some(_), None) => Err(AppError::NoBranchSelected),
        }
    }

    fn require_organization(&self) -> Result<Uuid, AppError> {
        self.scope()
            .organization_id
            .ok_or(AppError::NoOrganizationSelected)
    }

    // Toda falha remota chega à fatia de erro e ao coletor de
    // notificações uma única vez.
    fn surface(&self, error: &RemoteError) {
        self.dispatch(InventoryAction::SetError(error.message.clone()));
        self.notifier.notify_error(&error.message);
    }
}

fn validate_patch(patch: &ProductPatch) -> Result<(), AppError> {
    if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
        return Err(field_error("name", "length", "O nome do produto é obrigatório.").into());
    }
    if matches!(&patch.sku, Some(sku) if sku.trim().is_empty()) {
        return Err(field_error("sku", "length", "O SKU é obrigatório.").into());
    }
    if matches!(&patch.category, Some(category) if category.trim().is_empty()) {
        return Err(field_error("category", "length", "A categoria é obrigatória.").into());
    }
    if matches!(&patch.price, Some(price) if price.is_sign_negative()) {
        return Err(field_error("price", "negative_value", "O preço não pode ser negativo.").into());
    }
    Ok(())
}
