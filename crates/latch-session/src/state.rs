//! Authentication state and storage tier selection
//!
//! Two-state machine:
//! ```text
//! Anonymous
//!   ↓ login (success)
//! Authenticated
//!   ↓ logout / expiry
//! Anonymous
//! ```
//! A failed login leaves the machine in Anonymous.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    /// No session; `user` is empty
    Anonymous,
    /// A session exists and is persisted in exactly one tier
    Authenticated,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Anonymous => "anonymous",
            AuthState::Authenticated => "authenticated",
        }
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which tier holds the serialized session. Tracked explicitly from the
/// moment of login or restore, never re-derived by probing the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    /// Survives process restarts (file-backed)
    Durable,
    /// Scoped to the current process lifetime (in-memory)
    Ephemeral,
}

impl StorageTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTier::Durable => "durable",
            StorageTier::Ephemeral => "ephemeral",
        }
    }
}

impl std::fmt::Display for StorageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
