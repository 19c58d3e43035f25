//! Application state management.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::{AppError, AuthPersistence, DashboardApi};
use crate::infra::api::{ApiClientConfig, HttpApiClient, SessionLostHandler};

use super::applications_store::ApplicationsStore;
use super::auth_store::AuthStore;
use super::route_guard::RouteGuard;
use super::two_factor::{CodeVerifier, TwoFactorGate};
use super::wallets_store::WalletsStore;

/// Stores for one dashboard session, built at start-up and torn down with
/// [`AppState::shutdown`]
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn DashboardApi>,
    pub auth: Arc<AuthStore>,
    pub applications: Arc<ApplicationsStore>,
    pub wallets: Arc<WalletsStore>,
    pub two_factor: Arc<TwoFactorGate>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Create state over any API implementation
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>, persistence: Arc<dyn AuthPersistence>) -> Self {
        Self::with_auth_store(api, persistence, |store| store)
    }

    fn with_auth_store(
        api: Arc<dyn DashboardApi>,
        persistence: Arc<dyn AuthPersistence>,
        configure: impl FnOnce(AuthStore) -> AuthStore,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let auth = configure(AuthStore::new(
            Arc::clone(&api),
            persistence,
            shutdown.child_token(),
        ));
        Self {
            auth: Arc::new(auth),
            applications: Arc::new(ApplicationsStore::new(
                Arc::clone(&api),
                shutdown.child_token(),
            )),
            wallets: Arc::new(WalletsStore::new(
                Arc::clone(&api),
                shutdown.child_token(),
            )),
            two_factor: Arc::new(TwoFactorGate::disabled()),
            api,
            shutdown,
        }
    }

    /// Build the HTTP client and wire its session-lost callback to this state
    pub fn connect(
        config: &ApiClientConfig,
        persistence: Arc<dyn AuthPersistence>,
    ) -> Result<Self, AppError> {
        let client = Arc::new(HttpApiClient::new(config)?);
        let timeout = config.session_check_timeout;
        let state = Self::with_auth_store(
            Arc::clone(&client) as Arc<dyn DashboardApi>,
            persistence,
            |store| store.with_session_check_timeout(timeout),
        );
        client.set_on_session_lost(state.session_lost_handler());

        info!(base_url = %config.base_url, "Dashboard state connected");
        Ok(state)
    }

    /// Put protected views behind a second factor checked by `verifier`
    pub fn enable_two_factor(&self, verifier: impl CodeVerifier + 'static) {
        self.two_factor.enable_with(verifier);
    }

    /// Callback that clears the session and second factor.
    ///
    /// Must not capture the client, which stores this handler.
    pub fn session_lost_handler(&self) -> SessionLostHandler {
        let reset_auth = self.auth.reset_handle();
        let two_factor = Arc::clone(&self.two_factor);
        Arc::new(move || {
            reset_auth();
            two_factor.reset();
        })
    }

    /// Sign out and drop second-factor verification
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.auth.sign_out().await?;
        self.two_factor.reset();
        Ok(())
    }

    /// A fresh guard for one protected view
    #[must_use]
    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::mount(Arc::clone(&self.auth)).with_two_factor(Arc::clone(&self.two_factor))
    }

    /// Cancel in-flight store actions; their results are discarded
    pub fn shutdown(&self) {
        info!("Shutting down dashboard state");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
