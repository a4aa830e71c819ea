//! Error types for masterplan.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Local Errors ===
    #[error("{0}")]
    Validation(String),

    #[error("request in progress")]
    Busy,

    #[error("ROOT node is missing for project {0}; create it manually")]
    MissingRoot(i64),

    // === Server Rejections ===
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("External service error ({status}): {detail}")]
    ExternalService { status: u16, detail: String },

    // === Infrastructure Errors ===
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Pub/Sub error: {0}")]
    PubSub(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code for log records and machine-readable output.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Busy => "BUSY",
            Self::MissingRoot(_) => "MISSING_ROOT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::PubSub(_) => "PUBSUB_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error was raised before any request left the client.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Busy)
    }

    /// The single message shown to the user at the action boundary.
    ///
    /// Server rejections surface the `detail` verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(detail) | Self::Conflict(detail) => detail.clone(),
            Self::ExternalService { detail, .. } => detail.clone(),
            Self::Transport(_) => "request failed; check the connection and try again".to_string(),
            other => other.to_string(),
        }
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
