// src/services/dashboard.rs

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::models::dashboard::{CategoryBreakdown, InventorySummary, StatusBreakdown, TopProduct};
use crate::models::inventory::{Product, StockStatus};
use crate::services::inventory::InventoryStore;

// Métricas derivadas do snapshot do inventário. Nada aqui consulta o
// gateway; é tudo cálculo local sobre o estado já carregado.
#[derive(Clone)]
pub struct DashboardService {
    store: Arc<InventoryStore>,
}

impl DashboardService {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        Self { store }
    }

    // Os cards do topo do painel.
    pub fn summary(&self) -> InventorySummary {
        let state = self.store.snapshot();
        InventorySummary {
            total_products: state.products.len(),
            low_stock: count_status(&state.products, StockStatus::LowStock),
            out_of_stock: count_status(&state.products, StockStatus::OutOfStock),
            total_value: total_value(&state.products),
        }
    }

    // Uma fatia por categoria cadastrada, mesmo as sem produto.
    pub fn category_distribution(&self) -> Vec<CategoryBreakdown> {
        let state = self.store.snapshot();
        state
            .categories
            .iter()
            .map(|category| {
                let matching: Vec<&Product> = state
                    .products
                    .iter()
                    .filter(|product| product.category == category.name)
                    .collect();
                CategoryBreakdown {
                    name: category.name.clone(),
                    product_count: matching.len(),
                    total_value: matching
                        .iter()
                        .map(|product| product.stock_value())
                        .sum(),
                }
            })
            .collect()
    }

    // Sempre as três faixas, na ordem fixa dos gráficos.
    pub fn status_distribution(&self) -> Vec<StatusBreakdown> {
        let state = self.store.snapshot();
        [
            StockStatus::InStock,
            StockStatus::LowStock,
            StockStatus::OutOfStock,
        ]
        .into_iter()
        .map(|status| StatusBreakdown {
            status,
            count: count_status(&state.products, status),
        })
        .collect()
    }

    // Curva ABC: os `limit` produtos de maior valor em estoque.
    pub fn top_products_by_value(&self, limit: usize) -> Vec<TopProduct> {
        let state = self.store.snapshot();
        let mut products = state.products;
        products.sort_by(|a, b| b.stock_value().cmp(&a.stock_value()));
        products
            .into_iter()
            .take(limit)
            .map(|product| TopProduct {
                id: product.id,
                name: product.name.clone(),
                sku: product.sku.clone(),
                quantity: product.quantity,
                stock_value: product.stock_value(),
            })
            .collect()
    }

    // Produtos que pedem atenção: estoque baixo ou zerado.
    pub fn low_stock_alerts(&self) -> Vec<Product> {
        let state = self.store.snapshot();
        state
            .products
            .into_iter()
            .filter(|product| {
                matches!(
                    product.status,
                    StockStatus::LowStock | StockStatus::OutOfStock
                )
            })
            .collect()
    }
}

fn count_status(products: &[Product], status: StockStatus) -> usize {
    products
        .iter()
        .filter(|product| product.status == status)
        .count()
}

fn total_value(products: &[Product]) -> Decimal {
    products.iter().map(|product| product.stock_value()).sum()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::common::notify::RecordingNotifier;
    use crate::gateway::MemoryGateway;
    use crate::models::inventory::Category;
    use crate::services::inventory::InventoryAction;

    fn product(name: &str, category: &str, quantity: u32, price: Decimal, min_stock: u32) -> Product {
        Product {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            name: name.to_string(),
            sku: format!("SKU-{}", name),
            category: category.to_string(),
            supplier: String::new(),
            location: String::new(),
            quantity,
            price,
            min_stock,
            status: StockStatus::derive(quantity, min_stock),
            created_at: Utc::now(),
        }
    }

    fn dashboard_with(products: Vec<Product>, categories: Vec<Category>) -> DashboardService {
        let store = Arc::new(InventoryStore::new(
            Arc::new(MemoryGateway::new()),
            Arc::new(RecordingNotifier::new()),
        ));
        store.dispatch(InventoryAction::LoadProducts(products));
        store.dispatch(InventoryAction::LoadCategories(categories));
        DashboardService::new(store)
    }

    #[test]
    fn summary_counts_and_totals() {
        let dashboard = dashboard_with(
            vec![
                product("Café", "Bebidas", 10, Decimal::new(500, 2), 2),
                product("Chá", "Bebidas", 1, Decimal::new(300, 2), 5),
                product("Açúcar", "Mercearia", 0, Decimal::new(200, 2), 3),
            ],
            Vec::new(),
        );

        let summary = dashboard.summary();
        assert_eq!(summary.total_products, 3);
        assert_eq!(summary.low_stock, 1);
        assert_eq!(summary.out_of_stock, 1);
        // 10×5,00 + 1×3,00 + 0×2,00
        assert_eq!(summary.total_value, Decimal::new(5300, 2));
    }

    #[test]
    fn category_distribution_includes_empty_categories() {
        let organization_id = Uuid::new_v4();
        let categories = vec![
            Category {
                id: Uuid::new_v4(),
                organization_id,
                name: "Bebidas".to_string(),
            },
            Category {
                id: Uuid::new_v4(),
                organization_id,
                name: "Limpeza".to_string(),
            },
        ];
        let dashboard = dashboard_with(
            vec![product("Café", "Bebidas", 2, Decimal::new(1000, 2), 1)],
            categories,
        );

        let distribution = dashboard.category_distribution();
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution[0].product_count, 1);
        assert_eq!(distribution[0].total_value, Decimal::new(2000, 2));
        assert_eq!(distribution[1].product_count, 0);
        assert_eq!(distribution[1].total_value, Decimal::ZERO);
    }

    #[test]
    fn top_products_sorted_by_stock_value() {
        let dashboard = dashboard_with(
            vec![
                product("Barato", "Geral", 100, Decimal::new(100, 2), 1),
                product("Caro", "Geral", 2, Decimal::new(100_00, 2), 1),
                product("Médio", "Geral", 10, Decimal::new(500, 2), 1),
            ],
            Vec::new(),
        );

        let top = dashboard.top_products_by_value(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Caro");
        assert_eq!(top[0].stock_value, Decimal::new(200_00, 2));
        assert_eq!(top[1].name, "Barato");
    }

    #[test]
    fn status_distribution_keeps_fixed_order() {
        let dashboard = dashboard_with(
            vec![
                product("A", "Geral", 10, Decimal::ONE, 1),
                product("B", "Geral", 0, Decimal::ONE, 1),
            ],
            Vec::new(),
        );

        let distribution = dashboard.status_distribution();
        assert_eq!(distribution[0].status, StockStatus::InStock);
        assert_eq!(distribution[0].count, 1);
        assert_eq!(distribution[1].status, StockStatus::LowStock);
        assert_eq!(distribution[1].count, 0);
        assert_eq!(distribution[2].status, StockStatus::OutOfStock);
        assert_eq!(distribution[2].count, 1);
    }

    #[test]
    fn low_stock_alerts_lists_low_and_out() {
        let dashboard = dashboard_with(
            vec![
                product("Ok", "Geral", 10, Decimal::ONE, 1),
                product("Baixo", "Geral", 1, Decimal::ONE, 5),
                product("Zerado", "Geral", 0, Decimal::ONE, 5),
            ],
            Vec::new(),
        );

        let alerts = dashboard.low_stock_alerts();
        let names: Vec<&str> = alerts.iter().map(|product| product.name.as_str()).collect();
        assert_eq!(names, vec!["Baixo", "Zerado"]);
    }
}
