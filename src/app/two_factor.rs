//! Second-factor gate in front of sensitive views.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

/// Length of a one-time code
pub const CODE_LENGTH: usize = 6;

/// Checks a well-formed one-time code
pub trait CodeVerifier: Send + Sync {
    fn verify(&self, code: &str) -> bool;
}

/// Accepts a single fixed code
#[derive(Debug, Clone)]
pub struct StaticCodeVerifier {
    code: String,
}

impl StaticCodeVerifier {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CodeVerifier for StaticCodeVerifier {
    fn verify(&self, code: &str) -> bool {
        self.code == code
    }
}

pub struct TwoFactorGate {
    enabled: AtomicBool,
    verified: AtomicBool,
    verifier: RwLock<Option<Box<dyn CodeVerifier>>>,
}

impl TwoFactorGate {
    /// Gate that never challenges
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            verified: AtomicBool::new(false),
            verifier: RwLock::new(None),
        }
    }

    /// Enabled gate backed by `verifier`
    #[must_use]
    pub fn new(verifier: impl CodeVerifier + 'static) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            verified: AtomicBool::new(false),
            verifier: RwLock::new(Some(Box::new(verifier))),
        }
    }

    /// Install a verifier and turn the gate on
    pub fn enable_with(&self, verifier: impl CodeVerifier + 'static) {
        *self.verifier.write().unwrap_or_else(|p| p.into_inner()) = Some(Box::new(verifier));
        self.reset();
        self.set_enabled(true);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::SeqCst)
    }

    /// True while protected content must stay behind the challenge
    pub fn requires_challenge(&self) -> bool {
        self.is_enabled() && !self.is_verified()
    }

    /// Submit a code. Anything other than six ASCII digits is rejected
    /// without consulting the verifier.
    pub fn verify(&self, code: &str) -> bool {
        let well_formed = code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit());
        let accepted = well_formed
            && self
                .verifier
                .read()
                .unwrap_or_else(|p| p.into_inner())
                .as_ref()
                .is_some_and(|verifier| verifier.verify(code));

        if accepted {
            self.verified.store(true, Ordering::SeqCst);
            info!("Two-factor verification succeeded");
        } else {
            warn!("Two-factor verification failed");
        }
        accepted
    }

    /// Drop verification, e.g. on sign-out
    pub fn reset(&self) {
        self.verified.store(false, Ordering::SeqCst);
    }
}
