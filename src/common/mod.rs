pub mod error;
pub use error::{AppError, PartialSetupError, SetupStep};

pub mod notify;
pub use notify::{NotificationSink, RecordingNotifier, TracingNotifier};
