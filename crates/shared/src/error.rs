//! Application-wide error types.
//!
//! Every layer keeps its own `thiserror` enum; they all collapse into
//! [`AppError`] at the HTTP boundary, which renders the
//! `{success: false, error: {code, message}}` envelope.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Resource not found, or owned by someone else.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input, rejected before any mutation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (duplicate entry, entity still referenced).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many requests for a rate-limited operation.
    #[error("Rate limited: retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the operation may be retried.
        retry_after_secs: u64,
    },

    /// AI provider failed on a path that does not degrade.
    #[error("AI provider error: {0}")]
    UpstreamAi(String),

    /// The record store rejected a read or write.
    #[error("Store error: {0}")]
    Store(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::RateLimited { .. } => 429,
            Self::UpstreamAi(_) => 502,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::UpstreamAi(_) => "UPSTREAM_AI_FAILURE",
            Self::Store(_) => "STORE_WRITE_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to a client.
    ///
    /// Store and internal failures are replaced by a generic sentence so
    /// that SQL fragments and identifiers never leave the process.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(_) | Self::Internal(_) => "An internal error occurred".to_string(),
            Self::UpstreamAi(_) => "The AI service is unavailable".to_string(),
            Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::RateLimited { retry_after_secs } => {
                format!("Too many requests, retry in {retry_after_secs} seconds")
            }
        }
    }

    /// Builds the serializable error envelope.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.error_code(),
                message: self.public_message(),
            },
        }
    }
}

/// Error envelope returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Code and message.
    pub error: ErrorDetail,
}

/// Code and human-readable message of an error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Client-safe message.
    pub message: String,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
