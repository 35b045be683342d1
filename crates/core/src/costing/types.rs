//! Inventory costing domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    BatchId, ChannelId, Cents, JournalEntryId, Quantity, SaleCogsId, StockLocationId, VariantId,
};

/// What to do when a sale asks for more than the open batches hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversellPolicy {
    /// Fail the sale with `InsufficientStock`.
    Reject,
    /// Cost the uncovered quantity at the supplied wholesale price.
    #[default]
    WholesaleEstimate,
}

impl OversellPolicy {
    /// Returns the string representation of the policy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::WholesaleEstimate => "wholesale_estimate",
        }
    }

    /// Parses a policy from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reject" => Some(Self::Reject),
            "wholesale_estimate" => Some(Self::WholesaleEstimate),
            _ => None,
        }
    }
}

/// How a sale line's COGS was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CogsSource {
    /// Fully covered by FIFO batches.
    Fifo,
    /// Partly covered by batches, remainder estimated.
    FifoWithEstimate,
    /// No batch stock at all; fully estimated.
    WholesaleEstimate,
}

impl CogsSource {
    /// Returns the string representation of the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fifo => "fifo",
            Self::FifoWithEstimate => "fifo_with_estimate",
            Self::WholesaleEstimate => "wholesale_estimate",
        }
    }

    /// Parses a source from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fifo" => Some(Self::Fifo),
            "fifo_with_estimate" => Some(Self::FifoWithEstimate),
            "wholesale_estimate" => Some(Self::WholesaleEstimate),
            _ => None,
        }
    }

    /// Returns true if any quantity was estimated.
    #[must_use]
    pub const fn is_estimate(&self) -> bool {
        !matches!(self, Self::Fifo)
    }
}

/// Where an inventory batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSource {
    /// Goods received from a supplier.
    Purchase,
    /// A positive stock correction.
    StockAdjustment,
    /// Backfilled opening stock.
    OpeningStock,
}

impl BatchSource {
    /// Returns the string representation of the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::StockAdjustment => "stock_adjustment",
            Self::OpeningStock => "opening_stock",
        }
    }

    /// Parses a source from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(Self::Purchase),
            "stock_adjustment" => Some(Self::StockAdjustment),
            "opening_stock" => Some(Self::OpeningStock),
            _ => None,
        }
    }

    /// Movement type written when a batch of this source is created.
    #[must_use]
    pub const fn creation_movement(&self) -> MovementType {
        match self {
            Self::Purchase => MovementType::Purchase,
            Self::StockAdjustment | Self::OpeningStock => MovementType::Adjustment,
        }
    }
}

/// Kind of quantity change recorded against a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Batch created by a purchase.
    Purchase,
    /// Quantity consumed by a sale.
    Sale,
    /// Correction, write-off or opening stock.
    Adjustment,
}

impl MovementType {
    /// Returns the string representation of the movement type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "PURCHASE",
            Self::Sale => "SALE",
            Self::Adjustment => "ADJUSTMENT",
        }
    }

    /// Parses a movement type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PURCHASE" => Some(Self::Purchase),
            "SALE" => Some(Self::Sale),
            "ADJUSTMENT" => Some(Self::Adjustment),
            _ => None,
        }
    }
}

/// The state of an open batch as read for allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBatch {
    /// Batch id.
    pub id: BatchId,
    /// Quantity left when read.
    pub remaining: Quantity,
    /// Cost per unit.
    pub unit_cost: Cents,
    /// Creation time, the FIFO key.
    pub created_at: DateTime<Utc>,
}

/// Quantity taken from one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAllocation {
    /// Batch consumed.
    pub batch_id: BatchId,
    /// Quantity taken.
    pub quantity: Quantity,
    /// Batch unit cost.
    pub unit_cost: Cents,
    /// Remaining quantity observed before the decrement.
    pub observed_remaining: Quantity,
}

impl BatchAllocation {
    /// Remaining quantity after the decrement.
    #[must_use]
    pub fn remaining_after(&self) -> Quantity {
        self.observed_remaining - self.quantity
    }
}

/// A fully costed plan for consuming stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostingPlan {
    /// Batches to decrement, oldest first.
    pub allocations: Vec<BatchAllocation>,
    /// Quantity not covered by batches and costed at the estimate price.
    pub estimated_quantity: Quantity,
    /// Total cost, rounded once.
    pub cogs: Cents,
    /// How the cost was determined.
    pub source: CogsSource,
}

/// Input for recording received stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPurchaseInput {
    /// Channel.
    pub channel_id: ChannelId,
    /// Variant received.
    pub variant_id: VariantId,
    /// Location received into.
    pub stock_location_id: StockLocationId,
    /// Quantity received.
    pub quantity: Quantity,
    /// Cost per unit.
    pub unit_cost: Cents,
    /// Batch metadata.
    pub batch: BatchMeta,
}

/// Descriptive fields of a new batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMeta {
    /// Origin of the stock.
    pub source: BatchSource,
    /// Purchase order, adjustment or import reference.
    pub source_id: String,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input for costing a sold order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSaleInput {
    /// Channel.
    pub channel_id: ChannelId,
    /// Variant sold.
    pub variant_id: VariantId,
    /// Location sold from.
    pub stock_location_id: StockLocationId,
    /// Quantity sold.
    pub quantity: Quantity,
    /// Order id.
    pub order_id: String,
    /// Order line id.
    pub order_line_id: String,
    /// When the sale happened (defaults to now).
    pub sale_date: Option<DateTime<Utc>>,
    /// Catalog wholesale price per unit, for the oversell estimate.
    pub wholesale_price: Option<Cents>,
}

/// Input for writing off stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordWriteOffInput {
    /// Channel.
    pub channel_id: ChannelId,
    /// Variant written off.
    pub variant_id: VariantId,
    /// Location written off from.
    pub stock_location_id: StockLocationId,
    /// Quantity written off.
    pub quantity: Quantity,
    /// Why, stored as the movement reference.
    pub reason: String,
}

/// A stored inventory batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryBatch {
    /// Batch id.
    pub id: BatchId,
    /// Channel.
    pub channel_id: ChannelId,
    /// Location.
    pub stock_location_id: StockLocationId,
    /// Variant.
    pub variant_id: VariantId,
    /// Quantity at creation.
    pub quantity_original: Quantity,
    /// Quantity left; zero means exhausted.
    pub quantity_remaining: Quantity,
    /// Cost per unit.
    pub unit_cost: Cents,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Origin of the stock.
    pub source: BatchSource,
    /// Origin reference.
    pub source_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// The COGS audit record for one sold order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCogs {
    /// Row id.
    pub id: SaleCogsId,
    /// Channel.
    pub channel_id: ChannelId,
    /// Order id.
    pub order_id: String,
    /// Order line id.
    pub order_line_id: String,
    /// Variant sold.
    pub variant_id: VariantId,
    /// Location sold from.
    pub stock_location_id: StockLocationId,
    /// When the sale happened.
    pub sale_date: DateTime<Utc>,
    /// Quantity sold.
    pub quantity: Quantity,
    /// Cost of goods sold.
    pub cogs: Cents,
    /// How the cost was determined.
    pub source: CogsSource,
    /// Quantity costed at the estimate price.
    pub estimated_quantity: Quantity,
    /// COGS journal entry, if one was posted.
    pub journal_entry_id: Option<JournalEntryId>,
}

/// Result of recording a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOutcome {
    /// The stored COGS row.
    pub sale: SaleCogs,
    /// True if the row already existed and nothing was consumed.
    pub replayed: bool,
}

/// Result of writing off stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOffOutcome {
    /// Batches decremented, oldest first.
    pub allocations: Vec<BatchAllocation>,
    /// Cost of the written-off stock.
    pub cost: Cents,
    /// Stock adjustment journal entry, if one was posted.
    pub journal_entry_id: Option<JournalEntryId>,
}
