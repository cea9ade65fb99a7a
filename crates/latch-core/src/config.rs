//! Authenticator configuration

use latch_session::Timing;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the durable store database file
    pub database_path: PathBuf,
    /// Simulated delay before the startup restore, in milliseconds
    pub bootstrap_delay_ms: u64,
    /// Simulated delay before login, signup, and reset resolve, in milliseconds
    pub login_delay_ms: u64,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        let timing = Timing::default();

        Self {
            database_path: data_dir.join("latch.db"),
            bootstrap_delay_ms: timing.bootstrap_delay.as_millis() as u64,
            login_delay_ms: timing.login_delay.as_millis() as u64,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("latch"))
            .unwrap_or_else(|| PathBuf::from(".latch"))
    }

    pub fn timing(&self) -> Timing {
        Timing {
            bootstrap_delay: Duration::from_millis(self.bootstrap_delay_ms),
            login_delay: Duration::from_millis(self.login_delay_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}
