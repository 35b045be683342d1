//! Approval bridge error types.

use thiserror::Error;

/// Errors raised by an approval gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// The external approval system refused or failed the request.
    #[error("Approval gateway failed: {0}")]
    Gateway(String),

    /// The decision payload named an unknown outcome.
    #[error("Invalid approval decision: {0}")]
    InvalidDecision(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ApprovalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Gateway(_) => "APPROVAL_GATEWAY_ERROR",
            Self::InvalidDecision(_) => "INVALID_APPROVAL_DECISION",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Gateway(_) => 502,
            Self::InvalidDecision(_) => 400,
            Self::Database(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}
