//! Authenticator composition root
//!
//! Owns the storage tiers and the session manager. Consumers construct an
//! `Authenticator` at process start and pass it to their UI layers
//! explicitly; there is no global singleton.

use latch_session::{AuthState, Session, SessionManager, SessionUpdate};
use latch_storage::Store;

use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

pub struct Authenticator {
    config: Config,
    session_manager: SessionManager,
}

impl Authenticator {
    /// Open the storage tiers and build the manager. The durable tier is
    /// file-backed; the ephemeral tier lives and dies with this process.
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let durable = Store::open(&config.database_path)?;
        let ephemeral = Store::open_in_memory()?;
        let session_manager = SessionManager::new(durable, ephemeral, config.timing());

        Ok(Self {
            config,
            session_manager,
        })
    }

    /// Run the startup restore.
    pub async fn initialize(&self) -> Result<()> {
        self.session_manager.initialize().await?;

        tracing::info!(state = %self.session_manager.state(), "Authenticator initialized");

        Ok(())
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }

    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> Result<bool> {
        Ok(self
            .session_manager
            .login(email, password, remember_me)
            .await?)
    }

    pub async fn signup(&self, email: &str, password: &str, remember_me: bool) -> Result<bool> {
        Ok(self
            .session_manager
            .signup(email, password, remember_me)
            .await?)
    }

    pub async fn request_password_reset(&self, email: &str) -> bool {
        self.session_manager.request_password_reset(email).await
    }

    pub fn logout(&self) -> Result<()> {
        Ok(self.session_manager.logout()?)
    }

    pub fn update_user(&self, update: SessionUpdate) -> Result<Option<Session>> {
        Ok(self.session_manager.update_user(update)?)
    }

    pub fn validate_session(&self) -> Result<bool> {
        Ok(self.session_manager.validate_session()?)
    }

    pub fn user(&self) -> Option<Session> {
        self.session_manager.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_manager.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.session_manager.is_loading()
    }

    pub fn state(&self) -> AuthState {
        self.session_manager.state()
    }

    /// Cancel background work ahead of teardown.
    pub fn shutdown(&self) {
        self.session_manager.shutdown();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Clone for Authenticator {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            session_manager: self.session_manager.clone(),
        }
    }
}

// Implement std::io::Error conversion for fs operations
impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}
