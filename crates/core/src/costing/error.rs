//! Costing error types for inventory and COGS operations.

use rust_decimal::Decimal;
use tally_shared::types::Quantity;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors that can occur during inventory costing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostingError {
    // ========== Validation Errors ==========
    /// Quantity is finer than one decimal place.
    #[error("Quantity {0} is finer than one decimal place; only multiples of 0.1 are allowed")]
    InvalidQuantityGranularity(Decimal),

    /// Quantity does not fit in the supported range.
    #[error("Quantity {0} is out of range")]
    QuantityOutOfRange(Decimal),

    /// Quantity must be strictly positive.
    #[error("Quantity must be positive, got {0}")]
    NonPositiveQuantity(Quantity),

    /// Unit cost cannot be negative.
    #[error("Unit cost cannot be negative, got {0} cents")]
    NegativeUnitCost(i64),

    /// Order or order line id is empty or too long.
    #[error("Invalid order reference: {0}")]
    InvalidOrderReference(String),

    /// Source id is empty or too long.
    #[error("Invalid batch source id: {0:?}")]
    InvalidSourceId(String),

    /// Computed cost does not fit in the supported range.
    #[error("Computed cost overflows the supported range")]
    CostOverflow,

    // ========== Stock Errors ==========
    /// Not enough stock to cover the request under the active policy.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        /// Quantity asked for.
        requested: Quantity,
        /// Quantity left across open batches.
        available: Quantity,
    },

    // ========== Concurrency Errors ==========
    /// A batch changed between read and decrement.
    #[error("Concurrent modification of inventory batches, please retry")]
    ConcurrentModification,

    // ========== Nested Errors ==========
    /// COGS posting failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl CostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuantityGranularity(_) => "INVALID_QUANTITY_GRANULARITY",
            Self::QuantityOutOfRange(_) => "INVALID_QUANTITY",
            Self::NonPositiveQuantity(_) => "NON_POSITIVE_QUANTITY",
            Self::NegativeUnitCost(_) => "NEGATIVE_UNIT_COST",
            Self::InvalidOrderReference(_) => "INVALID_ORDER_REFERENCE",
            Self::InvalidSourceId(_) => "INVALID_SOURCE_ID",
            Self::CostOverflow => "COST_OVERFLOW",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Ledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidQuantityGranularity(_)
            | Self::QuantityOutOfRange(_)
            | Self::NonPositiveQuantity(_)
            | Self::NegativeUnitCost(_)
            | Self::InvalidOrderReference(_)
            | Self::InvalidSourceId(_)
            | Self::CostOverflow => 400,
            Self::InsufficientStock { .. } => 422,
            Self::ConcurrentModification => 409,
            Self::Ledger(e) => e.http_status_code(),
            Self::Database(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<tally_shared::types::QuantityError> for CostingError {
    fn from(err: tally_shared::types::QuantityError) -> Self {
        use tally_shared::types::QuantityError;
        match err {
            QuantityError::InvalidGranularity(d) => Self::InvalidQuantityGranularity(d),
            QuantityError::OutOfRange(d) => Self::QuantityOutOfRange(d),
        }
    }
}
