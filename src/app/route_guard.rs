//! Gate for protected views.
//!
//! ```text
//! Unknown ──check──▶ Loading ──▶ Authenticated
//!                            └─▶ Unauthenticated
//! ```
//!
//! A guard runs the session check at most once per mount, and never when the
//! auth store already reports an authenticated session.

use std::sync::Arc;

use tracing::debug;

use super::auth_store::AuthStore;
use super::two_factor::TwoFactorGate;

/// Where unauthenticated users are sent
pub const SIGN_IN_PATH: &str = "/auth/sign-in";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unknown,
    Loading,
    Authenticated,
    Unauthenticated,
}

/// What the view layer should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Placeholder,
    Render,
    TwoFactorRequired,
    Redirect(&'static str),
}

pub struct RouteGuard {
    auth: Arc<AuthStore>,
    two_factor: Option<Arc<TwoFactorGate>>,
    state: GuardState,
    checked: bool,
}

impl RouteGuard {
    #[must_use]
    pub fn mount(auth: Arc<AuthStore>) -> Self {
        Self {
            auth,
            two_factor: None,
            state: GuardState::Unknown,
            checked: false,
        }
    }

    #[must_use]
    pub fn with_two_factor(mut self, gate: Arc<TwoFactorGate>) -> Self {
        self.two_factor = Some(gate);
        self
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Whether this mount has already asked the backend
    pub fn has_checked(&self) -> bool {
        self.checked
    }

    /// Bring the guard up to date and return what to render.
    ///
    /// Only the first call on an unauthenticated, idle store awaits the
    /// network; later calls read the store.
    pub async fn resolve(&mut self) -> GuardDecision {
        if !self.checked && self.state_from_store() == GuardState::Unauthenticated {
            self.checked = true;
            self.state = GuardState::Loading;
            debug!("Route guard checking session");
            self.auth.check_session().await;
        }
        self.state = self.state_from_store();
        self.decision()
    }

    /// Render decision for the current state, without any I/O
    pub fn decision(&self) -> GuardDecision {
        match self.state {
            GuardState::Unknown | GuardState::Loading => GuardDecision::Placeholder,
            GuardState::Unauthenticated => GuardDecision::Redirect(SIGN_IN_PATH),
            GuardState::Authenticated => {
                if self
                    .two_factor
                    .as_ref()
                    .is_some_and(|gate| gate.requires_challenge())
                {
                    GuardDecision::TwoFactorRequired
                } else {
                    GuardDecision::Render
                }
            }
        }
    }

    fn state_from_store(&self) -> GuardState {
        let auth = self.auth.snapshot();
        if auth.is_authenticated {
            GuardState::Authenticated
        } else if auth.is_loading {
            GuardState::Loading
        } else {
            GuardState::Unauthenticated
        }
    }
}
