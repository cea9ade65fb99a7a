//! Session error types
//!
//! Validation failures are not errors; they surface as boolean results.
//! These variants cover infrastructure faults only.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] latch_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
