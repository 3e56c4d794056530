// src/main.rs

use std::sync::Arc;

use rust_decimal::Decimal;

use inventory_core::common::notify::TracingNotifier;
use inventory_core::config::AppState;
use inventory_core::gateway::{MemoryGateway, MemoryProvider};
use inventory_core::models::auth::SignUpData;
use inventory_core::models::inventory::NewProduct;

// Demonstração do núcleo com os dubles em memória: cria uma conta,
// movimenta o estoque e imprime o resumo no log.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Inicializa o logger, que fica no main.
    tracing_subscriber::fmt().with_target(false).compact().init();

    let provider = Arc::new(MemoryProvider::new());
    let gateway = Arc::new(MemoryGateway::new());
    let app = AppState::new(provider, gateway, Arc::new(TracingNotifier));

    // Sem sessão anterior: o estado apenas volta a não autenticado.
    app.session.resume_session().await;

    // .expect() é bom aqui: se a demo falhar, o processo não deve seguir.
    let sign_up = SignUpData {
        email: "dona@mercearia.com".to_string(),
        password: "segredo123".to_string(),
        full_name: "Dona da Loja".to_string(),
        organization_name: "Mercearia Central".to_string(),
    };
    app.session
        .sign_up(&sign_up)
        .await
        .expect("Falha ao criar a conta de demonstração.");

    app.store
        .add_category("Bebidas")
        .await
        .expect("Falha ao cadastrar a categoria.");

    let cafe = app
        .store
        .add_product(NewProduct {
            name: "Café Torrado 500g".to_string(),
            sku: "CAF-500".to_string(),
            category: "Bebidas".to_string(),
            supplier: String::new(),
            location: String::new(),
            quantity: 12,
            price: Decimal::new(1890, 2),
            min_stock: 4,
        })
        .await
        .expect("Falha ao cadastrar o produto.");

    app.store
        .update_quantity(cafe.id, 3)
        .await
        .expect("Falha ao ajustar a quantidade.");

    let summary = app.dashboard.summary();
    tracing::info!(
        "📦 {} produto(s), {} com estoque baixo, {} zerado(s), valor total {}",
        summary.total_products,
        summary.low_stock,
        summary.out_of_stock,
        summary.total_value
    );

    let backup = app
        .transfer
        .export_json()
        .expect("Falha ao gerar o backup.");
    tracing::info!("🗂️ Backup gerado ({} bytes)", backup.len());

    app.session
        .sign_out()
        .await
        .expect("Falha ao encerrar a sessão.");
    app.shutdown();
}
