//! One-shot refresh-and-retry policy for expired sessions.
//!
//! A request starts in [`RefreshState::Initial`]. A 401 from a refreshable
//! endpoint moves it to `Refreshing`; a successful refresh moves it to
//! `Retried`, and whatever the retry returns is accepted. A failed refresh
//! ends in `SessionLost`. No path through the machine sends the original
//! request more than twice.

/// Endpoints whose 401 is a genuine answer rather than an expired session
pub const NON_REFRESHABLE_PATHS: &[&str] =
    &["/auth/sign-in", "/auth/sign-up", "/auth/refresh-tokens"];

const UNAUTHORIZED: u16 = 401;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Initial,
    Refreshing,
    Retried,
    SessionLost,
}

/// What the client should do with the response it just received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Accept,
    RefreshThenRetry,
}

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    state: RefreshState,
    refreshable: bool,
}

impl RefreshPolicy {
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        let path = path.split('?').next().unwrap_or(path);
        Self {
            state: RefreshState::Initial,
            refreshable: !NON_REFRESHABLE_PATHS.contains(&path),
        }
    }

    #[must_use]
    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn on_status(&mut self, status: u16) -> RetryAction {
        match self.state {
            RefreshState::Initial if status == UNAUTHORIZED && self.refreshable => {
                self.state = RefreshState::Refreshing;
                RetryAction::RefreshThenRetry
            }
            _ => RetryAction::Accept,
        }
    }

    pub fn on_refresh_succeeded(&mut self) {
        if self.state == RefreshState::Refreshing {
            self.state = RefreshState::Retried;
        }
    }

    pub fn on_refresh_failed(&mut self) {
        if self.state == RefreshState::Refreshing {
            self.state = RefreshState::SessionLost;
        }
    }
}
