//! Mapping of storage failures onto domain errors.

use sea_orm::{DbErr, SqlErr};
use tally_core::approval::ApprovalError;
use tally_core::costing::CostingError;
use tally_core::ledger::LedgerError;
use tally_core::reconciliation::ReconciliationError;
use tally_core::session::SessionError;

/// Domain errors that can carry a storage failure.
pub(crate) trait DbFailure {
    /// Wrap a `SeaORM` error.
    fn from_db(err: DbErr) -> Self;
}

impl DbFailure for LedgerError {
    fn from_db(err: DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl DbFailure for CostingError {
    fn from_db(err: DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl DbFailure for ReconciliationError {
    fn from_db(err: DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl DbFailure for SessionError {
    fn from_db(err: DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl DbFailure for ApprovalError {
    fn from_db(err: DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// True if the error is a unique index violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
