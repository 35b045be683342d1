//! Cashier session error types.

use tally_shared::types::SessionId;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::reconciliation::ReconciliationError;

/// Errors that can occur during the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    // ========== Validation Errors ==========
    /// Till id is empty or too long.
    #[error("Till id must be 1-64 characters")]
    InvalidTillId,

    // ========== State Errors ==========
    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Operation requires an open session.
    #[error("Session {0} is not open")]
    SessionNotOpen(SessionId),

    /// Session is closed; closed sessions are never reopened.
    #[error("Session {0} is already closed")]
    AlreadyClosed(SessionId),

    /// The till already has a session that is not closed.
    #[error("Till {till_id} already has an open session {session_id}")]
    SessionAlreadyOpen {
        /// The till.
        till_id: String,
        /// The existing session.
        session_id: SessionId,
    },

    // ========== Concurrency Errors ==========
    /// The session changed state while this operation was running.
    #[error("Session {0} was modified concurrently, please retry")]
    ConcurrentModification(SessionId),

    // ========== Nested Errors ==========
    /// Snapshot failed.
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    /// Posting the adjustment failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl SessionError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTillId => "INVALID_TILL_ID",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::SessionNotOpen(_) => "SESSION_NOT_OPEN",
            Self::AlreadyClosed(_) => "ALREADY_CLOSED",
            Self::SessionAlreadyOpen { .. } => "SESSION_ALREADY_OPEN",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Reconciliation(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidTillId => 400,
            Self::SessionNotFound(_) => 404,
            Self::SessionNotOpen(_)
            | Self::AlreadyClosed(_)
            | Self::SessionAlreadyOpen { .. }
            | Self::ConcurrentModification(_) => 409,
            Self::Reconciliation(e) => e.http_status_code(),
            Self::Ledger(e) => e.http_status_code(),
            Self::Database(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}
