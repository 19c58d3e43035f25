//! Session and current-user state.
//!
//! Credentials are never held here: the API client's cookie jar carries
//! them. This store only tracks who is signed in and whether a session check
//! has resolved. The single value persisted across restarts is the
//! `is_authenticated` flag, so a reload can skip a redundant session check.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::{
    AppError, AuthPersistence, CurrentUser, DashboardApi, PersistedAuth, SignInInput,
    SignUpInput, UpdateProfileInput,
};
use crate::infra::api::DEFAULT_SESSION_CHECK_TIMEOUT_SECS;

use super::store::{ActionStatus, StoreCell};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<CurrentUser>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Set once a session check has resolved, either way
    pub session_checked: bool,
}

impl ActionStatus for AuthState {
    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

impl AuthState {
    fn sign_out_locally(&mut self) {
        self.user = None;
        self.is_authenticated = false;
    }
}

pub struct AuthStore {
    api: Arc<dyn DashboardApi>,
    persistence: Arc<dyn AuthPersistence>,
    cell: StoreCell<AuthState>,
    session_check_timeout: Duration,
}

impl AuthStore {
    /// Create the store, restoring the persisted authentication flag
    #[must_use]
    pub fn new(
        api: Arc<dyn DashboardApi>,
        persistence: Arc<dyn AuthPersistence>,
        shutdown: CancellationToken,
    ) -> Self {
        let restored = match persistence.load() {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to restore auth state");
                PersistedAuth::default()
            }
        };

        let initial = AuthState {
            is_authenticated: restored.is_authenticated,
            ..Default::default()
        };

        Self {
            api,
            persistence,
            cell: StoreCell::new(initial, shutdown),
            session_check_timeout: Duration::from_secs(DEFAULT_SESSION_CHECK_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_session_check_timeout(mut self, timeout: Duration) -> Self {
        self.session_check_timeout = timeout;
        self
    }

    pub fn snapshot(&self) -> AuthState {
        self.cell.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cell.read().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.cell.read().is_loading
    }

    pub fn user(&self) -> Option<CurrentUser> {
        self.cell.read().user.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.cell.read().error.clone()
    }

    /// Ask the backend who is signed in.
    ///
    /// Races `/auth/me` against the session-check timeout. A failure or a
    /// timeout both resolve to "not authenticated"; this never returns an
    /// error and never leaves `is_loading` set.
    #[instrument(skip(self))]
    pub async fn check_session(&self) {
        self.cell.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let timeout = self.session_check_timeout;
        let outcome = self
            .cell
            .guarded(async {
                tokio::time::timeout(timeout, self.api.current_user())
                    .await
                    .map_err(|_| AppError::Timeout("Auth check timed out".to_string()))?
            })
            .await;

        match outcome {
            Ok(user) => {
                info!(user_id = %user.id, "Session is valid");
                self.cell.update(|s| {
                    s.user = Some(user);
                    s.is_authenticated = true;
                    s.is_loading = false;
                    s.session_checked = true;
                });
                self.persist(true);
            }
            Err(AppError::Cancelled) => {
                self.cell.update(|s| s.is_loading = false);
            }
            Err(e) => {
                warn!(error = %e, "Session check failed");
                self.cell.update(|s| {
                    s.sign_out_locally();
                    s.is_loading = false;
                    s.session_checked = true;
                });
                self.persist(false);
            }
        }
    }

    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<(), AppError> {
        let input = SignUpInput::new(email, password, name);
        self.cell
            .run("sign_up", self.api.sign_up(&input), |s, response| {
                s.user = Some(response.user.clone());
                s.is_authenticated = true;
                s.session_checked = true;
            })
            .await?;
        self.persist(true);
        Ok(())
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AppError> {
        let input = SignInInput::new(email, password);
        self.cell
            .run("sign_in", self.api.sign_in(&input), |s, response| {
                s.user = Some(response.user.clone());
                s.is_authenticated = true;
                s.session_checked = true;
            })
            .await?;
        self.persist(true);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.cell
            .run("sign_out", self.api.sign_out(), |s, _| s.sign_out_locally())
            .await?;
        self.persist(false);
        Ok(())
    }

    /// Replace the user and mark the session authenticated
    pub fn set_user(&self, user: CurrentUser) {
        self.cell.update(|s| {
            s.user = Some(user);
            s.is_authenticated = true;
        });
        self.persist(true);
    }

    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        name: Option<String>,
        image: Option<String>,
    ) -> Result<(), AppError> {
        let input = UpdateProfileInput { name, image };
        self.cell
            .run(
                "update_profile",
                self.api.update_profile(&input),
                |s, user| s.user = Some(user.clone()),
            )
            .await?;
        Ok(())
    }

    pub fn clear_error(&self) {
        self.cell.clear_error();
    }

    /// Forget the session after the backend refused to renew it
    pub fn reset_session(&self) {
        reset_shared(&self.cell.shared(), self.persistence.as_ref());
    }

    /// Closure that resets this store; safe to hand to the API client
    pub(crate) fn reset_handle(&self) -> impl Fn() + Send + Sync + 'static {
        let state = self.cell.shared();
        let persistence = Arc::clone(&self.persistence);
        move || reset_shared(&state, persistence.as_ref())
    }

    fn persist(&self, is_authenticated: bool) {
        let result = if is_authenticated {
            self.persistence.save(PersistedAuth { is_authenticated })
        } else {
            self.persistence.clear()
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist auth state");
        }
    }
}

fn reset_shared(state: &RwLock<AuthState>, persistence: &dyn AuthPersistence) {
    {
        let mut guard = state.write().unwrap_or_else(|p| p.into_inner());
        guard.sign_out_locally();
        guard.is_loading = false;
    }
    if let Err(e) = persistence.clear() {
        warn!(error = %e, "Failed to clear persisted auth state");
    }
    info!("Session lost, authentication state cleared");
}
