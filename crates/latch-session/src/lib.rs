//! LATCH Session Management
//!
//! Single source of truth for the demo authentication flow:
//! - A mocked provider accepts any well-formed email and password after a
//!   simulated network delay; there is no server round-trip.
//! - While authenticated, the session snapshot lives in exactly one
//!   storage tier: durable when remembered, ephemeral otherwise.
//! - Sessions expire after 24 hours; a background sweep enforces this and
//!   is cancelled the moment the user logs out.

mod error;
mod manager;
mod session;
mod state;
mod validate;

pub use error::SessionError;
pub use manager::{SessionManager, Timing};
pub use session::{Session, SessionUpdate};
pub use state::{AuthState, StorageTier};
pub use validate::{is_valid_email, is_valid_password, MIN_PASSWORD_LEN};

pub type Result<T> = std::result::Result<T, SessionError>;
