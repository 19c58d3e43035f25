//! Probe entry point: drives the dashboard state against a live backend.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use odipay_client::app::{AppState, GuardDecision};
use odipay_client::domain::{AuthPersistence, PageRequest};
use odipay_client::infra::{ApiClientConfig, FileAuthPersistence, MemoryAuthPersistence};

/// Probe configuration
struct Config {
    api: ApiClientConfig,
    /// File holding the persisted auth flag (in-memory when unset)
    auth_state_path: Option<PathBuf>,
    /// Credentials used when the stored session is gone
    credentials: Option<(String, SecretString)>,
}

impl Config {
    fn from_env() -> Result<Self> {
        let api = ApiClientConfig::from_env().context("Invalid API client configuration")?;

        let auth_state_path = env::var("ODIPAY_AUTH_STATE_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let email = env::var("ODIPAY_EMAIL").ok().filter(|e| !e.is_empty());
        let password = env::var("ODIPAY_PASSWORD").ok().filter(|p| !p.is_empty());
        let credentials = match (email, password) {
            (Some(email), Some(password)) => Some((email, SecretString::from(password))),
            (Some(_), None) => {
                warn!("ODIPAY_EMAIL set without ODIPAY_PASSWORD, sign-in disabled");
                None
            }
            _ => None,
        };

        Ok(Self {
            api,
            auth_state_path,
            credentials,
        })
    }

    fn persistence(&self) -> Arc<dyn AuthPersistence> {
        match &self.auth_state_path {
            Some(path) => Arc::new(FileAuthPersistence::new(path)),
            None => Arc::new(MemoryAuthPersistence::new()),
        }
    }
}

fn init_tracing() {
    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,odipay_client=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

async fn probe(state: &AppState, config: &Config) -> Result<()> {
    let mut guard = state.route_guard();
    let mut decision = guard.resolve().await;
    info!(?decision, "Route guard resolved");

    if let GuardDecision::Redirect(path) = decision {
        let Some((email, password)) = &config.credentials else {
            info!(redirect = path, "Not signed in and no credentials configured");
            return Ok(());
        };
        state
            .auth
            .sign_in(email, password.expose_secret())
            .await
            .context("Sign in failed")?;
        decision = guard.resolve().await;
        info!(?decision, "Signed in");
    }

    if let Some(user) = state.auth.user() {
        info!(user_id = %user.id, email = %user.email, role = %user.role, "Current user");
    }

    state
        .wallets
        .fetch_wallets()
        .await
        .context("Failed to fetch wallets")?;
    for wallet in state.wallets.wallets() {
        info!(
            wallet_id = %wallet.id,
            currency = %wallet.currency,
            available = %wallet.balance.available_balance,
            "Wallet"
        );
    }

    state
        .applications
        .fetch_applications(PageRequest::default())
        .await
        .context("Failed to fetch applications")?;
    let pagination = state.applications.pagination();
    info!(
        shown = state.applications.applications().len(),
        total = pagination.total,
        pages = pagination.total_pages,
        "Applications"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();
    let config = Config::from_env()?;

    info!("Odi Pay probe v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::connect(&config.api, config.persistence())?;

    let outcome = tokio::select! {
        result = probe(&state, &config) => result,
        _ = shutdown_signal() => Ok(()),
    };

    state.shutdown();
    if let Err(e) = &outcome {
        warn!(error = %e, "Probe finished with an error");
    } else {
        info!("Probe complete");
    }
    outcome
}
