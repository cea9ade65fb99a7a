//! Session manager
//!
//! Owns authentication state, session persistence, and expiry. Login and
//! signup are mocked: any well-formed email and long-enough password is
//! accepted after a simulated network delay. While authenticated, the
//! serialized session lives in exactly one storage tier and a background
//! sweep expires it after 24 hours.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use latch_storage::Store;

use crate::session::{Session, SessionUpdate};
use crate::state::{AuthState, StorageTier};
use crate::validate;
use crate::Result;

/// Storage key for the serialized session snapshot.
const KEY_USER: &str = "user";
/// Storage key for the authenticated flag; only the literal "true" counts.
const KEY_AUTH_FLAG: &str = "isAuthenticated";

/// Sessions older than this are expired by the sweep.
const SESSION_MAX_AGE_HOURS: i64 = 24;
/// How often the background sweep re-checks an authenticated session.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Simulated network latency of the mocked provider.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Delay before the startup session restore.
    pub bootstrap_delay: Duration,
    /// Delay before login, signup, and reset requests resolve.
    pub login_delay: Duration,
}

impl Timing {
    /// No artificial latency. Meant for tests.
    pub fn immediate() -> Self {
        Self {
            bootstrap_delay: Duration::ZERO,
            login_delay: Duration::ZERO,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            bootstrap_delay: Duration::from_millis(500),
            login_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SweepControl {
    Run,
    Stop,
}

struct AuthInner {
    /// Current session; `Some` exactly while authenticated
    session: Option<Session>,
    /// Tier holding the serialized snapshot; `Some` exactly while authenticated
    tier: Option<StorageTier>,
    /// True only until the startup restore has finished
    loading: bool,
}

pub struct SessionManager {
    inner: Arc<RwLock<AuthInner>>,
    /// Durable tier (survives restarts)
    durable: Store,
    /// Ephemeral tier (process lifetime only)
    ephemeral: Store,
    timing: Timing,
    /// Control channel of the running expiry sweep, if any
    sweeper: Arc<Mutex<Option<watch::Sender<SweepControl>>>>,
}

impl SessionManager {
    pub fn new(durable: Store, ephemeral: Store, timing: Timing) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AuthInner {
                session: None,
                tier: None,
                loading: true,
            })),
            durable,
            ephemeral,
            timing,
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// One-time startup restore. Only the durable tier is consulted; a
    /// session that was not remembered does not survive a restart.
    pub async fn initialize(&self) -> Result<Option<Session>> {
        tokio::time::sleep(self.timing.bootstrap_delay).await;

        // Loading ends no matter how the restore went
        let restored = self.restore_from_durable();
        self.inner.write().loading = false;
        let restored = restored?;

        if restored.is_some() {
            self.start_sweeper();
        }

        Ok(restored)
    }

    fn restore_from_durable(&self) -> Result<Option<Session>> {
        if self.durable.get(KEY_AUTH_FLAG)?.as_deref() != Some("true") {
            return Ok(None);
        }
        let Some(raw) = self.durable.get(KEY_USER)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                let mut inner = self.inner.write();
                inner.session = Some(session.clone());
                inner.tier = Some(StorageTier::Durable);

                tracing::info!(session_id = %session.id, "Restored remembered session");
                Ok(Some(session))
            }
            Err(e) => {
                // A snapshot that no longer parses is unrecoverable; drop
                // both keys and stay anonymous instead of surfacing it.
                tracing::warn!(error = %e, "Discarding corrupted session snapshot");
                self.durable.remove(KEY_USER)?;
                self.durable.remove(KEY_AUTH_FLAG)?;
                Ok(None)
            }
        }
    }

    /// Mocked login. Validation failures resolve to `Ok(false)` and leave
    /// all state untouched; only storage faults are errors.
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> Result<bool> {
        tokio::time::sleep(self.timing.login_delay).await;

        if !validate::is_valid_email(email) {
            tracing::debug!("Login rejected: malformed email");
            return Ok(false);
        }
        if !validate::is_valid_password(password) {
            tracing::debug!("Login rejected: password too short");
            return Ok(false);
        }

        let session = Session::new(email.to_string(), remember_me);
        let tier = if remember_me {
            StorageTier::Durable
        } else {
            StorageTier::Ephemeral
        };
        self.persist(&session, tier)?;

        {
            let mut inner = self.inner.write();
            inner.session = Some(session.clone());
            inner.tier = Some(tier);
        }
        self.start_sweeper();

        tracing::info!(session_id = %session.id, tier = %tier, "Logged in");
        Ok(true)
    }

    /// Mocked signup: the provider accepts any well-formed credentials and
    /// logs the new account straight in.
    pub async fn signup(&self, email: &str, password: &str, remember_me: bool) -> Result<bool> {
        let created = self.login(email, password, remember_me).await?;
        if created {
            tracing::info!("Signed up new account");
        }
        Ok(created)
    }

    /// Mocked password reset request. Resolves to whether the email looks
    /// deliverable; never touches session state.
    pub async fn request_password_reset(&self, email: &str) -> bool {
        tokio::time::sleep(self.timing.login_delay).await;
        validate::is_valid_email(email)
    }

    /// Write the snapshot to its tier and make sure the other tier holds
    /// nothing: exactly one tier carries a session while authenticated.
    fn persist(&self, session: &Session, tier: StorageTier) -> Result<()> {
        let snapshot = serde_json::to_string(session)?;
        let (target, other) = match tier {
            StorageTier::Durable => (&self.durable, &self.ephemeral),
            StorageTier::Ephemeral => (&self.ephemeral, &self.durable),
        };

        target.put(KEY_USER, &snapshot)?;
        target.put(KEY_AUTH_FLAG, "true")?;
        other.remove(KEY_USER)?;
        other.remove(KEY_AUTH_FLAG)?;

        Ok(())
    }

    /// Clear the in-memory session and purge both tiers. Safe to call when
    /// already anonymous.
    pub fn logout(&self) -> Result<()> {
        self.stop_sweeper();

        let previous = {
            let mut inner = self.inner.write();
            inner.tier = None;
            inner.session.take()
        };

        for store in [&self.durable, &self.ephemeral] {
            store.remove(KEY_USER)?;
            store.remove(KEY_AUTH_FLAG)?;
        }

        if let Some(session) = previous {
            tracing::info!(session_id = %session.id, "Logged out");
        }

        Ok(())
    }

    /// Shallow-merge profile fields into the current session and
    /// re-serialize to the tier that holds it. Ignored while anonymous.
    pub fn update_user(&self, update: SessionUpdate) -> Result<Option<Session>> {
        let (session, tier) = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            let (Some(session), Some(tier)) = (inner.session.as_mut(), inner.tier) else {
                tracing::debug!("update_user ignored while anonymous");
                return Ok(None);
            };
            session.apply(update);
            (session.clone(), tier)
        };

        let snapshot = serde_json::to_string(&session)?;
        let store = match tier {
            StorageTier::Durable => &self.durable,
            StorageTier::Ephemeral => &self.ephemeral,
        };
        store.put(KEY_USER, &snapshot)?;

        Ok(Some(session))
    }

    /// Expire sessions older than the 24-hour ceiling. Anonymous is a
    /// pass, not a failure.
    pub fn validate_session(&self) -> Result<bool> {
        let expired = {
            let inner = self.inner.read();
            match &inner.session {
                Some(session) => {
                    session.is_expired(chrono::Duration::hours(SESSION_MAX_AGE_HOURS))
                }
                None => return Ok(true),
            }
        };

        if expired {
            tracing::info!("Session expired");
            self.logout()?;
            return Ok(false);
        }

        Ok(true)
    }

    pub fn user(&self) -> Option<Session> {
        self.inner.read().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().session.is_some()
    }

    /// True only until the startup restore has finished.
    pub fn is_loading(&self) -> bool {
        self.inner.read().loading
    }

    pub fn state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    /// Which tier holds the current snapshot, if any.
    pub fn active_tier(&self) -> Option<StorageTier> {
        self.inner.read().tier
    }

    /// Stop background work ahead of teardown.
    pub fn shutdown(&self) {
        self.stop_sweeper();
    }

    fn start_sweeper(&self) {
        let mut guard = self.sweeper.lock();
        if guard.is_some() {
            return;
        }

        let (tx, mut rx) = watch::channel(SweepControl::Run);
        *guard = Some(tx);

        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            // the first tick completes immediately; the first sweep should
            // wait a full period
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => match manager.validate_session() {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => tracing::warn!(error = %e, "Expiry sweep failed"),
                    },
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() == SweepControl::Stop {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Expiry sweep stopped");
        });
    }

    fn stop_sweeper(&self) {
        if let Some(tx) = self.sweeper.lock().take() {
            let _ = tx.send(SweepControl::Stop);
        }
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            durable: self.durable.clone(),
            ephemeral: self.ephemeral.clone(),
            timing: self.timing,
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn manager() -> SessionManager {
        let durable = Store::open_in_memory().unwrap();
        let ephemeral = Store::open_in_memory().unwrap();
        SessionManager::new(durable, ephemeral, Timing::immediate())
    }

    fn seed_durable(manager: &SessionManager, session: &Session) {
        manager
            .durable
            .put(KEY_USER, &serde_json::to_string(session).unwrap())
            .unwrap();
        manager.durable.put(KEY_AUTH_FLAG, "true").unwrap();
    }

    fn backdated(hours: i64) -> Session {
        let mut session = Session::new("a@b.co".to_string(), true);
        session.login_time = Utc::now() - chrono::Duration::hours(hours);
        session
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let manager = manager();

        for email in ["plain", "missing@tld", "@nobody.com", "spa ce@mail.com"] {
            assert!(!manager.login(email, "abcdef", true).await.unwrap());
        }

        assert!(!manager.is_authenticated());
        assert_eq!(manager.durable.get(KEY_USER).unwrap(), None);
        assert_eq!(manager.ephemeral.get(KEY_USER).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_rejects_short_password() {
        let manager = manager();

        assert!(!manager.login("a@b.co", "12345", false).await.unwrap());
        assert!(!manager.login("a@b.co", "", false).await.unwrap());
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_remembered_login_persists_to_durable_only() {
        let manager = manager();

        assert!(manager.login("a@b.co", "abcdef", true).await.unwrap());
        assert!(manager.is_authenticated());
        assert_eq!(manager.active_tier(), Some(StorageTier::Durable));

        let raw = manager.durable.get(KEY_USER).unwrap().unwrap();
        let stored: Session = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.email, "a@b.co");
        assert!(stored.remember_me);
        assert_eq!(
            manager.durable.get(KEY_AUTH_FLAG).unwrap().as_deref(),
            Some("true")
        );

        assert_eq!(manager.ephemeral.get(KEY_USER).unwrap(), None);
        assert_eq!(manager.ephemeral.get(KEY_AUTH_FLAG).unwrap(), None);
    }

    #[tokio::test]
    async fn test_unremembered_login_persists_to_ephemeral_only() {
        let manager = manager();

        assert!(manager.login("a@b.co", "abcdef", false).await.unwrap());
        assert_eq!(manager.active_tier(), Some(StorageTier::Ephemeral));

        assert!(manager.ephemeral.get(KEY_USER).unwrap().is_some());
        assert_eq!(
            manager.ephemeral.get(KEY_AUTH_FLAG).unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(manager.durable.get(KEY_USER).unwrap(), None);
        assert_eq!(manager.durable.get(KEY_AUTH_FLAG).unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_purges_both_tiers_and_is_idempotent() {
        let manager = manager();
        manager.login("a@b.co", "abcdef", true).await.unwrap();

        manager.logout().unwrap();
        assert!(!manager.is_authenticated());
        assert_eq!(manager.state(), AuthState::Anonymous);
        for store in [&manager.durable, &manager.ephemeral] {
            assert_eq!(store.get(KEY_USER).unwrap(), None);
            assert_eq!(store.get(KEY_AUTH_FLAG).unwrap(), None);
        }

        // A second logout is a no-op, not an error
        manager.logout().unwrap();
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_validate_passes_fresh_session() {
        let manager = manager();
        seed_durable(&manager, &backdated(1));
        manager.initialize().await.unwrap();

        assert!(manager.validate_session().unwrap());
        assert!(manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_validate_expires_old_session() {
        let manager = manager();
        seed_durable(&manager, &backdated(25));
        manager.initialize().await.unwrap();
        assert!(manager.is_authenticated());

        assert!(!manager.validate_session().unwrap());
        assert_eq!(manager.state(), AuthState::Anonymous);
        assert_eq!(manager.durable.get(KEY_USER).unwrap(), None);
        assert_eq!(manager.durable.get(KEY_AUTH_FLAG).unwrap(), None);
    }

    #[tokio::test]
    async fn test_validate_passes_while_anonymous() {
        let manager = manager();
        assert!(manager.validate_session().unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_restores_remembered_session() {
        let manager = manager();
        seed_durable(&manager, &backdated(1));

        assert!(manager.is_loading());
        let restored = manager.initialize().await.unwrap();

        assert_eq!(restored.unwrap().email, "a@b.co");
        assert!(manager.is_authenticated());
        assert!(!manager.is_loading());
        assert_eq!(manager.active_tier(), Some(StorageTier::Durable));
    }

    #[tokio::test]
    async fn test_bootstrap_discards_corrupted_snapshot() {
        let manager = manager();
        manager.durable.put(KEY_USER, "{not json").unwrap();
        manager.durable.put(KEY_AUTH_FLAG, "true").unwrap();

        let restored = manager.initialize().await.unwrap();

        assert!(restored.is_none());
        assert!(!manager.is_authenticated());
        assert!(!manager.is_loading());
        assert_eq!(manager.durable.get(KEY_USER).unwrap(), None);
        assert_eq!(manager.durable.get(KEY_AUTH_FLAG).unwrap(), None);
    }

    #[tokio::test]
    async fn test_bootstrap_requires_literal_true_flag() {
        let manager = manager();
        manager
            .durable
            .put(KEY_USER, &serde_json::to_string(&backdated(1)).unwrap())
            .unwrap();
        manager.durable.put(KEY_AUTH_FLAG, "TRUE").unwrap();

        assert!(manager.initialize().await.unwrap().is_none());
        assert!(!manager.is_authenticated());
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn test_bootstrap_ignores_ephemeral_tier() {
        let manager = manager();
        manager
            .ephemeral
            .put(KEY_USER, &serde_json::to_string(&backdated(1)).unwrap())
            .unwrap();
        manager.ephemeral.put(KEY_AUTH_FLAG, "true").unwrap();

        assert!(manager.initialize().await.unwrap().is_none());
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_update_user_merges_and_persists_to_owning_tier() {
        let manager = manager();
        manager.login("a@b.co", "abcdef", true).await.unwrap();

        let updated = manager
            .update_user(SessionUpdate {
                display_name: Some("Ada".to_string()),
                ..Default::default()
            })
            .unwrap()
            .unwrap();

        assert_eq!(updated.display_name.as_deref(), Some("Ada"));
        assert_eq!(updated.email, "a@b.co");
        assert!(updated.remember_me);

        let raw = manager.durable.get(KEY_USER).unwrap().unwrap();
        let stored: Session = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("Ada"));
        assert_eq!(stored.id, updated.id);

        // The other tier stays empty
        assert_eq!(manager.ephemeral.get(KEY_USER).unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_user_follows_ephemeral_tier() {
        let manager = manager();
        manager.login("a@b.co", "abcdef", false).await.unwrap();

        manager
            .update_user(SessionUpdate {
                display_name: Some("Ada".to_string()),
                ..Default::default()
            })
            .unwrap();

        let raw = manager.ephemeral.get(KEY_USER).unwrap().unwrap();
        let stored: Session = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("Ada"));
        assert_eq!(manager.durable.get(KEY_USER).unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_user_is_noop_while_anonymous() {
        let manager = manager();
        let result = manager
            .update_user(SessionUpdate {
                display_name: Some("Ada".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(result.is_none());
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_signup_logs_new_account_in() {
        let manager = manager();

        assert!(manager.signup("new@user.io", "hunter2", false).await.unwrap());
        assert!(manager.is_authenticated());
        assert_eq!(manager.user().unwrap().email, "new@user.io");

        let other = self::manager();
        assert!(!other.signup("bad-email", "hunter2", false).await.unwrap());
        assert!(!other.is_authenticated());
    }

    #[tokio::test]
    async fn test_password_reset_never_touches_state() {
        let manager = manager();
        manager.login("a@b.co", "abcdef", true).await.unwrap();

        assert!(manager.request_password_reset("a@b.co").await);
        assert!(!manager.request_password_reset("not-an-email").await);
        assert!(manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_logout() {
        let manager = manager();
        manager.login("a@b.co", "abcdef", true).await.unwrap();
        assert!(manager.sweeper.lock().is_some());

        manager.logout().unwrap();
        assert!(manager.sweeper.lock().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_expires_stale_session() {
        let manager = manager();
        seed_durable(&manager, &backdated(25));
        manager.initialize().await.unwrap();
        assert!(manager.is_authenticated());
        assert!(manager.sweeper.lock().is_some());

        // Paused clock auto-advances past the first sweep interval
        tokio::time::sleep(Duration::from_secs(90)).await;

        assert!(!manager.is_authenticated());
        assert!(manager.sweeper.lock().is_none());
        assert_eq!(manager.durable.get(KEY_USER).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_keeps_fresh_session() {
        let manager = manager();
        manager.login("a@b.co", "abcdef", false).await.unwrap();

        tokio::time::sleep(Duration::from_secs(150)).await;

        assert!(manager.is_authenticated());
        assert!(manager.sweeper.lock().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_sweeper() {
        let manager = manager();
        manager.login("a@b.co", "abcdef", true).await.unwrap();

        manager.shutdown();
        assert!(manager.sweeper.lock().is_none());
        // State is untouched; shutdown is not a logout
        assert!(manager.is_authenticated());
    }
}
