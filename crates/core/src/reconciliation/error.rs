//! Reconciliation error types.

use tally_shared::types::{ReconciliationId, SessionId};
use thiserror::Error;

use super::types::ReconciliationStatus;
use crate::ledger::LedgerError;

/// Errors that can occur while snapshotting or resolving a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    // ========== Scope Errors ==========
    /// No accounts to reconcile.
    #[error("Reconciliation scope is empty")]
    EmptyScope,

    /// A non-system account in scope was not declared.
    #[error("Missing declaration for account {0}")]
    MissingDeclaration(String),

    /// A system account was declared by hand.
    #[error("Account {0} is a system account and cannot be declared")]
    ManualDeclarationOnSystemAccount(String),

    /// The short/over account itself was placed in scope.
    #[error("The short/over account {0} cannot be reconciled")]
    ShortOverAccountInScope(String),

    /// A declaration names an account outside the scope.
    #[error("Account {0} was declared but is not in the reconciliation scope")]
    DeclarationOutsideScope(String),

    // ========== Lookup Errors ==========
    /// Reconciliation not found.
    #[error("Reconciliation not found: {0}")]
    ReconciliationNotFound(ReconciliationId),

    /// Linked session not found in this channel.
    #[error("Linked session not found: {0}")]
    LinkedSessionNotFound(SessionId),

    // ========== State Errors ==========
    /// Only held reconciliations can be approved or rejected.
    #[error("Reconciliation {id} is {status}, not pending approval")]
    NotPendingApproval {
        /// The reconciliation.
        id: ReconciliationId,
        /// Its current status.
        status: ReconciliationStatus,
    },

    /// Status changed while the decision was being applied.
    #[error("Reconciliation {0} was modified concurrently, please retry")]
    ConcurrentModification(ReconciliationId),

    // ========== Nested Errors ==========
    /// Posting the adjustment failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ReconciliationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyScope => "EMPTY_SCOPE",
            Self::MissingDeclaration(_) => "MISSING_DECLARATION",
            Self::ManualDeclarationOnSystemAccount(_) => "MANUAL_DECLARATION_ON_SYSTEM_ACCOUNT",
            Self::ShortOverAccountInScope(_) => "SHORT_OVER_ACCOUNT_IN_SCOPE",
            Self::DeclarationOutsideScope(_) => "DECLARATION_OUTSIDE_SCOPE",
            Self::ReconciliationNotFound(_) => "RECONCILIATION_NOT_FOUND",
            Self::LinkedSessionNotFound(_) => "LINKED_SESSION_NOT_FOUND",
            Self::NotPendingApproval { .. } => "NOT_PENDING_APPROVAL",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Ledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::EmptyScope
            | Self::MissingDeclaration(_)
            | Self::ManualDeclarationOnSystemAccount(_)
            | Self::ShortOverAccountInScope(_)
            | Self::DeclarationOutsideScope(_) => 400,
            Self::ReconciliationNotFound(_) | Self::LinkedSessionNotFound(_) => 404,
            Self::NotPendingApproval { .. } | Self::ConcurrentModification(_) => 409,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ReconciliationError::EmptyScope.error_code(), "EMPTY_SCOPE");
        let err = ReconciliationError::NotPendingApproval {
            id: ReconciliationId::new(),
            status: ReconciliationStatus::Posted,
        };
        assert_eq!(err.error_code(), "NOT_PENDING_APPROVAL");
        assert_eq!(err.http_status_code(), 409);
        assert!(err.to_string().contains("is posted, not pending approval"));
    }

    #[test]
    fn test_system_declaration_is_client_error() {
        let err = ReconciliationError::ManualDeclarationOnSystemAccount("CLEARING_MPESA".into());
        assert_eq!(err.http_status_code(), 400);
        assert!(!err.is_retryable());
    }
}
