// tests/store_flow.rs
//
// O InventoryStore contra o gateway em memória: recargas por escopo,
// descarte de buscas atrasadas e mutações confirmadas antes de
// aplicadas.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use inventory_core::InventoryStore;
use inventory_core::common::RecordingNotifier;
use inventory_core::models::inventory::{NewProduct, ProductInsert, StockStatus};
use inventory_core::models::tenancy::TenantScope;
use inventory_core::services::StoreEvent;
use inventory_core::{AppError, MemoryGateway};

struct Harness {
    store: Arc<InventoryStore>,
    gateway: Arc<MemoryGateway>,
    notifier: Arc<RecordingNotifier>,
}

fn build(gateway: MemoryGateway) -> Harness {
    let gateway = Arc::new(gateway);
    let notifier = Arc::new(RecordingNotifier::new());
    let store = Arc::new(InventoryStore::new(gateway.clone(), notifier.clone()));
    Harness {
        store,
        gateway,
        notifier,
    }
}

fn product_row(organization_id: Uuid, branch_id: Uuid, name: &str, quantity: u32) -> ProductInsert {
    ProductInsert {
        organization_id,
        branch_id,
        name: name.to_string(),
        sku: format!("SKU-{}", quantity),
        category: "Bebidas".to_string(),
        supplier: "Distribuidora Sul".to_string(),
        location: "Prateleira A".to_string(),
        quantity,
        price: Decimal::new(990, 2),
        min_stock: 2,
    }
}

fn coffee_draft() -> NewProduct {
    NewProduct {
        name: "Café Torrado".to_string(),
        sku: "CAF-500".to_string(),
        category: "Bebidas".to_string(),
        supplier: "Distribuidora Sul".to_string(),
        location: "Prateleira A".to_string(),
        quantity: 12,
        price: Decimal::new(1890, 2),
        min_stock: 4,
    }
}

#[tokio::test]
async fn complete_scope_loads_all_four_slices() {
    let gateway = MemoryGateway::new();
    let organization_id = Uuid::new_v4();
    let branch = gateway.seed_branch(organization_id, "Centro");
    gateway.seed_product(product_row(organization_id, branch.id, "Café Torrado", 12));
    gateway.seed_category(organization_id, "Bebidas");
    gateway.seed_supplier(organization_id, "Distribuidora Sul");
    gateway.seed_location(branch.id, "Prateleira A");

    let harness = build(gateway);
    harness
        .store
        .on_scope_changed(TenantScope::new(Some(organization_id), Some(branch.id)))
        .await;

    let state = harness.store.snapshot();
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(state.products.len(), 1);
    assert_eq!(state.categories.len(), 1);
    assert_eq!(state.suppliers.len(), 1);
    assert_eq!(state.locations.len(), 1);
}

#[tokio::test]
async fn incomplete_scope_never_reaches_the_gateway() {
    let harness = build(MemoryGateway::new());
    harness
        .store
        .on_scope_changed(TenantScope::new(Some(Uuid::new_v4()), None))
        .await;

    assert!(harness.gateway.calls().is_empty());
    let state = harness.store.snapshot();
    assert!(!state.loading);
    assert!(state.products.is_empty());
}

#[tokio::test]
async fn scope_change_discards_results_from_stale_fetches() {
    let gateway = MemoryGateway::new();
    let organization_id = Uuid::new_v4();
    let old_branch = gateway.seed_branch(organization_id, "Centro");
    let new_branch = gateway.seed_branch(organization_id, "Zona Sul");
    gateway.seed_product(product_row(organization_id, old_branch.id, "Café Torrado", 12));
    gateway.seed_product(product_row(organization_id, new_branch.id, "Erva Mate", 7));

    let harness = build(gateway);
    harness.gateway.hold("fetch_products");

    // A primeira troca fica presa na busca de produtos.
    let stale = {
        let store = Arc::clone(&harness.store);
        let scope = TenantScope::new(Some(organization_id), Some(old_branch.id));
        tokio::spawn(async move { store.on_scope_changed(scope).await })
    };
    tokio::task::yield_now().await;
    assert!(!stale.is_finished());

    // A segunda troca avança a geração antes de a resposta chegar.
    let current = {
        let store = Arc::clone(&harness.store);
        let scope = TenantScope::new(Some(organization_id), Some(new_branch.id));
        tokio::spawn(async move { store.on_scope_changed(scope).await })
    };
    tokio::task::yield_now().await;

    harness.gateway.release("fetch_products");
    stale.await.unwrap();
    current.await.unwrap();

    // Só o resultado da troca vigente encosta no estado.
    let state = harness.store.snapshot();
    let names: Vec<&str> = state
        .products
        .iter()
        .map(|product| product.name.as_str())
        .collect();
    assert_eq!(names, vec!["Erva Mate"]);
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(harness.gateway.calls_of("fetch_products"), 2);
}

#[tokio::test]
async fn fetch_failure_lands_in_the_error_slice_and_notifier_once() {
    let gateway = MemoryGateway::new();
    let organization_id = Uuid::new_v4();
    let branch = gateway.seed_branch(organization_id, "Centro");
    gateway.seed_category(organization_id, "Bebidas");
    gateway.fail_next("fetch_products", "Falha de rede ao buscar produtos.");

    let harness = build(gateway);
    harness
        .store
        .on_scope_changed(TenantScope::new(Some(organization_id), Some(branch.id)))
        .await;

    let state = harness.store.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("Falha de rede ao buscar produtos.")
    );
    assert!(!state.loading);
    assert!(state.products.is_empty());
    // As fatias que responderam continuam valendo.
    assert_eq!(state.categories.len(), 1);
    assert_eq!(state.categories[0].name, "Bebidas");
    assert_eq!(
        harness.notifier.errors(),
        vec!["Falha de rede ao buscar produtos.".to_string()]
    );
}

#[tokio::test]
async fn add_product_applies_only_after_remote_confirmation() {
    let gateway = MemoryGateway::new();
    let organization_id = Uuid::new_v4();
    let branch = gateway.seed_branch(organization_id, "Centro");
    let harness = build(gateway);
    harness
        .store
        .on_scope_changed(TenantScope::new(Some(organization_id), Some(branch.id)))
        .await;

    harness
        .gateway
        .fail_next("create_product", "Falha ao gravar o produto.");
    let error = harness.store.add_product(coffee_draft()).await.unwrap_err();
    assert!(matches!(error, AppError::RemoteError(_)));

    let state = harness.store.snapshot();
    assert!(state.products.is_empty());
    assert_eq!(state.error.as_deref(), Some("Falha ao gravar o produto."));
    assert_eq!(harness.notifier.errors().len(), 1);

    // Confirmado, o registro que voltou do gateway é o aplicado.
    let product = harness.store.add_product(coffee_draft()).await.unwrap();
    assert_eq!(product.status, StockStatus::InStock);
    let state = harness.store.snapshot();
    assert_eq!(state.products.len(), 1);
    assert!(!state.loading);
    assert!(
        harness
            .notifier
            .successes()
            .contains(&"Produto adicionado com sucesso!".to_string())
    );
}

#[tokio::test]
async fn quantity_updates_use_the_confirmed_record() {
    let gateway = MemoryGateway::new();
    let organization_id = Uuid::new_v4();
    let branch = gateway.seed_branch(organization_id, "Centro");
    let seeded = gateway.seed_product(product_row(organization_id, branch.id, "Café Torrado", 12));

    let harness = build(gateway);
    harness
        .store
        .on_scope_changed(TenantScope::new(Some(organization_id), Some(branch.id)))
        .await;

    // 2 unidades com mínimo 2 é estoque baixo; o status acompanha.
    let updated = harness.store.update_quantity(seeded.id, 2).await.unwrap();
    assert_eq!(updated.quantity, 2);
    assert_eq!(updated.status, StockStatus::LowStock);
    let state = harness.store.snapshot();
    assert_eq!(state.products[0].quantity, 2);

    // A falha remota não encosta na quantidade local.
    harness
        .gateway
        .fail_next("update_product_quantity", "Falha ao atualizar a quantidade.");
    let error = harness
        .store
        .update_quantity(seeded.id, 0)
        .await
        .unwrap_err();
    assert!(matches!(error, AppError::RemoteError(_)));
    let state = harness.store.snapshot();
    assert_eq!(state.products[0].quantity, 2);
    assert_eq!(
        state.error.as_deref(),
        Some("Falha ao atualizar a quantidade.")
    );
}

#[tokio::test]
async fn catalog_adds_skip_the_loading_cycle() {
    let gateway = MemoryGateway::new();
    let organization_id = Uuid::new_v4();
    let branch = gateway.seed_branch(organization_id, "Centro");
    gateway.seed_category(organization_id, "Bebidas");

    let harness = build(gateway);
    harness
        .store
        .on_scope_changed(TenantScope::new(Some(organization_id), Some(branch.id)))
        .await;

    // Nome repetido (mesmo com caixa e espaços diferentes) é barrado
    // antes de o gateway ser chamado.
    let error = harness.store.add_category("  bebidas ").await.unwrap_err();
    assert!(matches!(error, AppError::CategoryNameAlreadyExists(_)));
    assert_eq!(harness.gateway.calls_of("create_category"), 0);
    assert_eq!(harness.store.snapshot().categories.len(), 1);

    let mut events = harness.store.subscribe();
    harness.store.add_category("Limpeza").await.unwrap();

    let mut observed = Vec::new();
    while let Ok(event) = events.try_recv() {
        observed.push(event);
    }
    // O catálogo muda sem passar pelo ciclo de loading.
    assert_eq!(observed, vec![StoreEvent::Categories]);
    let state = harness.store.snapshot();
    assert_eq!(state.categories.len(), 2);
    assert!(!state.loading);
    assert!(
        harness
            .notifier
            .successes()
            .contains(&"Categoria adicionada com sucesso!".to_string())
    );
}
