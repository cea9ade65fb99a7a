//! Session data structure

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: String,
    /// Email the account was registered with
    pub email: String,
    /// Optional profile display name
    pub display_name: Option<String>,
    /// Whether the session should survive a process restart
    pub remember_me: bool,
    /// When the user logged in
    pub login_time: DateTime<Utc>,
}

impl Session {
    pub fn new(email: String, remember_me: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            display_name: None,
            remember_me,
            login_time: Utc::now(),
        }
    }

    /// Shallow-merge a partial update. Fields left unset in the update
    /// keep their current value.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(display_name) = update.display_name {
            self.display_name = Some(display_name);
        }
    }

    /// Time elapsed since login.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.login_time)
    }

    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}

/// Partial profile update for [`Session::apply`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub email: Option<String>,
    pub display_name: Option<String>,
}
