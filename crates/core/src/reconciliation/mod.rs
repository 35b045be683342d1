//! Reconciliation of declared against ledger-expected balances.
//!
//! This module implements:
//! - Snapshot row computation with system-account auto-declaration
//! - The variance hold policy
//! - Short/over adjustment entry construction
//! - Reconciliation kinds, statuses and error types

pub mod adjustment;
pub mod engine;
pub mod error;
pub mod policy;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use adjustment::AdjustmentBuilder;
pub use engine::ReconciliationEngine;
pub use error::ReconciliationError;
pub use policy::VariancePolicy;
pub use types::{
    Reconciliation, ReconciliationKind, ReconciliationLine, ReconciliationStatus, ScopedAccount,
    SnapshotInput, SnapshotOutcome,
};
