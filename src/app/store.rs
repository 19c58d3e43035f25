//! Shared bookkeeping for the state stores.

use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::AppError;

/// Loading and error slots every store state carries
pub trait ActionStatus {
    fn set_loading(&mut self, loading: bool);
    fn set_error(&mut self, error: Option<String>);
}

/// State behind a lock plus the cancellation scope of the owning `AppState`.
///
/// Locks are never held across an `.await`.
pub(crate) struct StoreCell<S> {
    state: Arc<RwLock<S>>,
    shutdown: CancellationToken,
}

impl<S: ActionStatus + Clone> StoreCell<S> {
    pub(crate) fn new(initial: S, shutdown: CancellationToken) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            shutdown,
        }
    }

    pub(crate) fn shared(&self) -> Arc<RwLock<S>> {
        Arc::clone(&self.state)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, S> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn snapshot(&self) -> S {
        self.read().clone()
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }

    /// Await `request` unless the store's scope is cancelled first
    pub(crate) async fn guarded<T>(
        &self,
        request: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        if self.shutdown.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(AppError::Cancelled),
            result = request => result,
        }
    }

    /// Run one store action.
    ///
    /// Sets the loading flag and clears the error, awaits the request, then
    /// either applies the result and clears loading, or records the error
    /// message. Cancelled requests never reach `apply`.
    pub(crate) async fn run<T>(
        &self,
        action: &'static str,
        request: impl Future<Output = Result<T, AppError>>,
        apply: impl FnOnce(&mut S, &T),
    ) -> Result<T, AppError> {
        self.update(|s| {
            s.set_loading(true);
            s.set_error(None);
        });

        match self.guarded(request).await {
            Ok(value) => {
                self.update(|s| {
                    apply(s, &value);
                    s.set_loading(false);
                });
                debug!(action, "Store action completed");
                Ok(value)
            }
            Err(AppError::Cancelled) => {
                self.update(|s| s.set_loading(false));
                debug!(action, "Store action cancelled, result discarded");
                Err(AppError::Cancelled)
            }
            Err(e) => {
                warn!(action, error = %e, "Store action failed");
                let message = e.to_string();
                self.update(|s| {
                    s.set_error(Some(message));
                    s.set_loading(false);
                });
                Err(e)
            }
        }
    }

    pub(crate) fn clear_error(&self) {
        self.update(|s| s.set_error(None));
    }
}
