use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::config_directory;
use crate::domain::session::SessionToken;
use crate::error::{AppError, AppResult};
use crate::services::{IdentityService, TokenSource};

const SESSION_FILE_NAME: &str = "session.json";

/// How often the scheduled task checks the token.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);
/// Remaining validity below which a check issues a refresh.
pub const REFRESH_THRESHOLD_SECS: i64 = 70;

/// Authentication gate state. Driven solely by the stored session; nothing
/// else in the application holds session logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// Durable storage for the session token, the only state kept across
/// invocations apart from configuration.
pub struct SessionStore {
    file_path: PathBuf,
}

impl SessionStore {
    pub fn open() -> AppResult<Self> {
        Ok(Self {
            file_path: config_directory()?.join(SESSION_FILE_NAME),
        })
    }

    pub fn with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn load(&self) -> AppResult<Option<SessionToken>> {
        match fs::read_to_string(&self.file_path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|err| AppError::Configuration(format!("invalid session file: {err}"))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self, token: &SessionToken) -> AppResult<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(token)
            .map_err(|err| AppError::Configuration(format!("failed to write session: {err}")))?;
        fs::write(&self.file_path, data)?;
        Ok(())
    }

    pub fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.file_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::Io(err)),
        }
    }
}

/// Owns the session token and its lifecycle: login, durable storage, the
/// scheduled refresh, and logout. The refresh task is cancellable and is
/// stopped on logout and on teardown so no timer outlives the session.
pub struct SessionManager {
    store: SessionStore,
    identity: Arc<dyn IdentityService>,
    current: RwLock<Option<SessionToken>>,
    state: RwLock<AuthState>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(store: SessionStore, identity: Arc<dyn IdentityService>) -> Self {
        Self {
            store,
            identity,
            current: RwLock::new(None),
            state: RwLock::new(AuthState::Initializing),
            refresh_task: Mutex::new(None),
        }
    }

    /// Loads the stored session. A token that is expired beyond refresh is
    /// discarded; a merely stale one is kept for the refresh task to renew.
    pub async fn initialize(&self) -> AppResult<AuthState> {
        let now = Utc::now().timestamp();
        let next = match self.store.load()? {
            Some(token) if !token.is_expired(now) || token.can_refresh(now) => {
                *self.current.write().await = Some(token);
                AuthState::Authenticated
            }
            Some(_) => {
                self.store.clear()?;
                AuthState::Unauthenticated
            }
            None => AuthState::Unauthenticated,
        };
        *self.state.write().await = next;
        Ok(next)
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    pub async fn current_token(&self) -> Option<SessionToken> {
        self.current.read().await.clone()
    }

    pub async fn login(&self, username: &str, password: &str) -> AppResult<SessionToken> {
        let token = self.identity.login(username, password).await?;
        self.store_session(token.clone()).await?;
        Ok(token)
    }

    /// Overwrites the stored token and marks the session authenticated.
    pub async fn store_session(&self, token: SessionToken) -> AppResult<()> {
        self.store.save(&token)?;
        *self.current.write().await = Some(token);
        *self.state.write().await = AuthState::Authenticated;
        Ok(())
    }

    /// Clears the local session and invalidates it remotely. Remote failure
    /// is non-fatal; the local session is gone either way.
    pub async fn logout(&self) -> AppResult<()> {
        self.stop_refresh_task().await;

        let previous = self.current.write().await.take();
        *self.state.write().await = AuthState::Unauthenticated;
        self.store.clear()?;

        if let Some(refresh_token) = previous.and_then(|token| token.refresh_token) {
            if let Err(err) = self.identity.logout(&refresh_token).await {
                tracing::warn!(error = %err, "remote session invalidation failed");
            }
        }
        Ok(())
    }

    /// One refresh check. Issues a refresh grant only when the remaining
    /// validity is below the threshold; a failed refresh keeps the stale
    /// token in place for the next API call to surface as a 401.
    pub async fn refresh_if_needed(&self, now: i64) -> AppResult<bool> {
        let refresh_token = {
            let current = self.current.read().await;
            match current.as_ref() {
                Some(token) if token.needs_refresh(now, REFRESH_THRESHOLD_SECS) => {
                    match &token.refresh_token {
                        Some(refresh_token) => refresh_token.clone(),
                        None => {
                            tracing::warn!("session token is expiring and cannot be refreshed");
                            return Ok(false);
                        }
                    }
                }
                _ => return Ok(false),
            }
        };

        match self.identity.refresh(&refresh_token).await {
            Ok(token) => {
                let remaining = token.remaining_validity(now);
                self.store_session(token).await?;
                tracing::debug!(valid_for = remaining, "session token refreshed");
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed, keeping the current token");
                Ok(false)
            }
        }
    }

    /// Starts the scheduled refresh task. The first check runs immediately,
    /// covering a session gone stale between invocations.
    pub async fn spawn_refresh_task(self: Arc<Self>) {
        let manager = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
            loop {
                ticker.tick().await;
                let now = Utc::now().timestamp();
                if let Err(err) = manager.refresh_if_needed(now).await {
                    tracing::warn!(error = %err, "could not persist the refreshed session");
                }
            }
        });

        if let Some(previous) = self.refresh_task.lock().await.replace(handle) {
            previous.abort();
        }
    }

    pub async fn stop_refresh_task(&self) {
        if let Some(handle) = self.refresh_task.lock().await.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl TokenSource for SessionManager {
    async fn current_bearer(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|token| token.access_token.clone())
    }
}

/// The authentication gate: commands that reach the remote API call this
/// before doing anything else.
pub async fn require_session(manager: &SessionManager) -> AppResult<SessionToken> {
    match manager.state().await {
        AuthState::Initializing => Err(AppError::Authentication(
            "the session is still initializing".to_string(),
        )),
        AuthState::Unauthenticated => Err(AppError::Authentication(
            "no active session, run `mesa login` first".to_string(),
        )),
        AuthState::Authenticated => manager.current_token().await.ok_or_else(|| {
            AppError::Authentication("no active session, run `mesa login` first".to_string())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubIdentity {
        refresh_calls: AtomicUsize,
        logout_calls: AtomicUsize,
        fail_refresh: bool,
    }

    impl StubIdentity {
        fn new() -> Self {
            Self {
                refresh_calls: AtomicUsize::new(0),
                logout_calls: AtomicUsize::new(0),
                fail_refresh: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_refresh: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl IdentityService for StubIdentity {
        async fn login(&self, _username: &str, _password: &str) -> AppResult<SessionToken> {
            Ok(fresh_token("login-token"))
        }

        async fn refresh(&self, _refresh_token: &str) -> AppResult<SessionToken> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                return Err(AppError::Authentication("refresh rejected".to_string()));
            }
            Ok(fresh_token("refreshed-token"))
        }

        async fn logout(&self, _refresh_token: &str) -> AppResult<()> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fresh_token(access: &str) -> SessionToken {
        SessionToken {
            access_token: access.to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: Utc::now().timestamp() + 3_600,
            refresh_expires_at: None,
            subject: Some("subject-1".to_string()),
            username: None,
        }
    }

    fn token_expiring_at(expires_at: i64) -> SessionToken {
        SessionToken {
            expires_at,
            ..fresh_token("stale-token")
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        identity: Arc<StubIdentity>,
        manager: Arc<SessionManager>,
    }

    fn fixture(identity: StubIdentity) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::with_path(dir.path().join("session.json"));
        let identity = Arc::new(identity);
        let manager = Arc::new(SessionManager::new(store, identity.clone()));
        Fixture {
            _dir: dir,
            identity,
            manager,
        }
    }

    #[tokio::test]
    async fn a_check_below_the_threshold_issues_a_refresh() {
        let fx = fixture(StubIdentity::new());
        let now = Utc::now().timestamp();
        fx.manager
            .store_session(token_expiring_at(now + 69))
            .await
            .unwrap();

        assert!(fx.manager.refresh_if_needed(now).await.unwrap());
        assert_eq!(fx.identity.refresh_calls.load(Ordering::SeqCst), 1);

        let token = fx.manager.current_token().await.unwrap();
        assert_eq!(token.access_token, "refreshed-token");
    }

    #[tokio::test]
    async fn a_check_at_or_above_the_threshold_issues_nothing() {
        let fx = fixture(StubIdentity::new());
        let now = Utc::now().timestamp();
        fx.manager
            .store_session(token_expiring_at(now + 70))
            .await
            .unwrap();

        assert!(!fx.manager.refresh_if_needed(now).await.unwrap());
        assert_eq!(fx.identity.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn a_failed_refresh_keeps_the_stale_token() {
        let fx = fixture(StubIdentity::failing());
        let now = Utc::now().timestamp();
        fx.manager
            .store_session(token_expiring_at(now + 30))
            .await
            .unwrap();

        assert!(!fx.manager.refresh_if_needed(now).await.unwrap());
        assert_eq!(fx.identity.refresh_calls.load(Ordering::SeqCst), 1);

        let token = fx.manager.current_token().await.unwrap();
        assert_eq!(token.access_token, "stale-token");
    }

    #[tokio::test]
    async fn initialize_reports_the_stored_session_state() {
        let fx = fixture(StubIdentity::new());
        assert_eq!(fx.manager.state().await, AuthState::Initializing);
        assert_eq!(
            fx.manager.initialize().await.unwrap(),
            AuthState::Unauthenticated
        );

        fx.manager.store_session(fresh_token("abc")).await.unwrap();
        assert_eq!(
            fx.manager.initialize().await.unwrap(),
            AuthState::Authenticated
        );
    }

    #[tokio::test]
    async fn initialize_discards_a_session_expired_beyond_refresh() {
        let fx = fixture(StubIdentity::new());
        let dead = SessionToken {
            expires_at: Utc::now().timestamp() - 100,
            refresh_token: None,
            ..fresh_token("dead")
        };
        fx.manager.store_session(dead).await.unwrap();

        assert_eq!(
            fx.manager.initialize().await.unwrap(),
            AuthState::Unauthenticated
        );
        // The store was cleared as well.
        let reloaded = SessionManager::new(
            SessionStore::with_path(fx._dir.path().join("session.json")),
            fx.identity.clone(),
        );
        assert_eq!(
            reloaded.initialize().await.unwrap(),
            AuthState::Unauthenticated
        );
    }

    #[tokio::test]
    async fn login_persists_and_logout_clears_and_invalidates() {
        let fx = fixture(StubIdentity::new());
        fx.manager.initialize().await.unwrap();
        fx.manager.login("ana", "secret").await.unwrap();
        assert_eq!(fx.manager.state().await, AuthState::Authenticated);
        assert_eq!(
            fx.manager.current_bearer().await.as_deref(),
            Some("login-token")
        );

        fx.manager.logout().await.unwrap();
        assert_eq!(fx.manager.state().await, AuthState::Unauthenticated);
        assert_eq!(fx.manager.current_bearer().await, None);
        assert_eq!(fx.identity.logout_calls.load(Ordering::SeqCst), 1);
        assert!(fx.manager.initialize().await.is_ok());
        assert_eq!(fx.manager.state().await, AuthState::Unauthenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn the_scheduled_task_refreshes_and_stops_on_demand() {
        let fx = fixture(StubIdentity::new());
        let now = Utc::now().timestamp();
        fx.manager
            .store_session(token_expiring_at(now + 30))
            .await
            .unwrap();

        Arc::clone(&fx.manager).spawn_refresh_task().await;
        // Let the immediate first tick run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fx.identity.refresh_calls.load(Ordering::SeqCst) >= 1);

        fx.manager.stop_refresh_task().await;
        let after_stop = fx.identity.refresh_calls.load(Ordering::SeqCst);
        tokio::time::sleep(REFRESH_INTERVAL * 3).await;
        assert_eq!(fx.identity.refresh_calls.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn the_guard_blocks_until_authenticated() {
        let fx = fixture(StubIdentity::new());
        assert!(matches!(
            require_session(&fx.manager).await.unwrap_err(),
            AppError::Authentication(_)
        ));

        fx.manager.initialize().await.unwrap();
        assert!(matches!(
            require_session(&fx.manager).await.unwrap_err(),
            AppError::Authentication(_)
        ));

        fx.manager.store_session(fresh_token("abc")).await.unwrap();
        let token = require_session(&fx.manager).await.unwrap();
        assert_eq!(token.access_token, "abc");
    }
}
