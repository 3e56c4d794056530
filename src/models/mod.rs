pub mod auth;
pub mod dashboard;
pub mod inventory;
pub mod tenancy;
pub mod transfer;
