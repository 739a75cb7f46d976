// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod oauth;
pub mod observability;
pub mod session;
pub mod storage;
pub mod types;

// Re-exports
pub use client::{AuthClient, AuthGateway};
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use oauth::{CallbackOutcome, handle_callback, token_from_fragment};
pub use observability::register_biometrics;
pub use session::{RestoreOutcome, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use types::*;
