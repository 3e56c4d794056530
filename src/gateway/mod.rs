pub mod remote;
pub use remote::{RemoteError, RemoteGateway};

pub mod session;
pub use session::{AuthEventSource, AuthSubscription, SessionProvider};

pub mod memory;
pub use memory::{MemoryGateway, MemoryProvider};
