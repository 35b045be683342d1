//! FIFO inventory costing.
//!
//! This module implements:
//! - Batch, movement and sale COGS types
//! - The FIFO allocator with single-point banker's rounding
//! - The explicit oversell policy
//! - Input validation and COGS journal entry construction

pub mod error;
pub mod fifo;
pub mod service;
pub mod types;

#[cfg(test)]
mod fifo_props;

pub use error::CostingError;
pub use fifo::{Allocation, FifoAllocator};
pub use service::CostingService;
pub use types::{
    BatchAllocation, BatchMeta, BatchSource, CogsSource, CostingPlan, InventoryBatch,
    MovementType, OpenBatch, OversellPolicy, RecordPurchaseInput, RecordSaleInput,
    RecordWriteOffInput, SaleCogs, SaleOutcome, WriteOffOutcome,
};
