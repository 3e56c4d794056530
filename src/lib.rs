// src/lib.rs

pub mod common;
pub mod config;
pub mod gateway;
pub mod models;
pub mod services;

pub use common::error::AppError;
pub use config::AppState;
pub use gateway::{MemoryGateway, MemoryProvider, RemoteGateway, SessionProvider};
pub use services::{
    DashboardService, InventoryStore, SessionContext, TenantScopeResolver, TransferService,
};
