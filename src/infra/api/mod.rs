//! Backend REST API integration.

pub mod client;
pub mod config;
pub mod retry;

pub use client::{HttpApiClient, SessionLostHandler};
pub use config::{
    ApiClientConfig, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SESSION_CHECK_TIMEOUT_SECS,
};
pub use retry::{NON_REFRESHABLE_PATHS, RefreshPolicy, RefreshState, RetryAction};
