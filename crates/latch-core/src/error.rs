//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] latch_storage::StorageError),

    #[error("Session error: {0}")]
    Session(#[from] latch_session::SessionError),

    #[error("Configuration error: {0}")]
    Config(String),
}
