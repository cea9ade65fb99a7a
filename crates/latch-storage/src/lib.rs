//! LATCH Storage Layer
//!
//! SQLite-backed key-value stores for session persistence. A file-backed
//! store is the durable tier (survives process restarts); an in-memory
//! store is the ephemeral tier (lives exactly as long as the process).
//! Both tiers share the same schema.

mod error;
mod migrations;
mod store;

pub use error::StorageError;
pub use store::Store;

pub type Result<T> = std::result::Result<T, StorageError>;
