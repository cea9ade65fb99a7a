//! LATCH Core
//!
//! Composition root for the LATCH demo authentication flow. Rust owns all
//! auth state; UI layers are stateless consumers of the capability set
//! exposed by [`Authenticator`].

mod authenticator;
mod config;
mod error;

pub use authenticator::Authenticator;
pub use config::Config;
pub use error::CoreError;

// Re-export core components
pub use latch_session::{
    AuthState, Session, SessionError, SessionManager, SessionUpdate, StorageTier, Timing,
};
pub use latch_storage::{StorageError, Store};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
