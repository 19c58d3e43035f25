//! Error types for the dashboard client.

use thiserror::Error;

/// Top-level error returned by the API client and the stores
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Timeout(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// True when the backend rejected the request because the session is gone
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Api(ApiError::Unauthorized(_)))
    }
}

/// Local schema violations, raised before any network call
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("{0}")]
    Multiple(String),
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ValidationError::Multiple(errors.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

/// Transport and envelope failures. `Display` is the human-readable message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    Network(String),

    #[error("{message}")]
    Status { status_code: u16, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Envelope(String),

    #[error("{0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the backend answered at all
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status_code, .. } => Some(*status_code),
            ApiError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}
