pub mod scope;
pub use scope::TenantScopeResolver;

pub mod session;
pub use session::{ActiveSession, SessionContext, SessionState};

pub mod inventory;
pub use inventory::{InventoryAction, InventoryState, InventoryStore, StoreEvent};

pub mod transfer;
pub use transfer::TransferService;

pub mod dashboard;
pub use dashboard::DashboardService;
