//! API client configuration.

use std::env;
use std::time::Duration;

use crate::domain::ConfigError;

/// Default backend base URL (the REST API lives under `/api/v1`)
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How long a session check may take before the user is treated as signed out
pub const DEFAULT_SESSION_CHECK_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClientConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    pub request_timeout: Duration,
    pub session_check_timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_check_timeout: Duration::from_secs(DEFAULT_SESSION_CHECK_TIMEOUT_SECS),
        }
    }
}

impl ApiClientConfig {
    /// Create a configuration for the given base URL, validating it
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            ..Default::default()
        })
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("ODIPAY_API_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let request_timeout = env::var("ODIPAY_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let session_check_timeout = env::var("ODIPAY_SESSION_CHECK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SESSION_CHECK_TIMEOUT_SECS);

        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            request_timeout: Duration::from_secs(request_timeout),
            session_check_timeout: Duration::from_secs(session_check_timeout),
        })
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_session_check_timeout(mut self, timeout: Duration) -> Self {
        self.session_check_timeout = timeout;
        self
    }
}

fn normalize_base_url(raw: String) -> Result<String, ConfigError> {
    let parsed = reqwest::Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
        name: "ODIPAY_API_URL".to_string(),
        message: e.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue {
            name: "ODIPAY_API_URL".to_string(),
            message: format!("{} cannot be used as a base URL", raw),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}
