//! String-backed enums stored in the database.
//!
//! Each enum mirrors a domain enum in `tally-core` and converts both ways.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::approval::{ApprovalRequestType, ApprovalStatus};
use tally_core::costing::{BatchSource, CogsSource, MovementType, OversellPolicy};
use tally_core::ledger::SourceType;
use tally_core::reconciliation::{ReconciliationKind, ReconciliationStatus};
use tally_core::session::SessionStatus;

/// Journal entry source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum EntrySourceType {
    /// Sale.
    #[sea_orm(string_value = "sale")]
    Sale,
    /// Purchase.
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Stock adjustment.
    #[sea_orm(string_value = "stock_adjustment")]
    StockAdjustment,
    /// Reconciliation adjustment.
    #[sea_orm(string_value = "reconciliation")]
    Reconciliation,
    /// Inter-account transfer.
    #[sea_orm(string_value = "inter_account_transfer")]
    InterAccountTransfer,
    /// Opening balance.
    #[sea_orm(string_value = "opening_balance")]
    OpeningBalance,
}

impl From<SourceType> for EntrySourceType {
    fn from(value: SourceType) -> Self {
        match value {
            SourceType::Sale => Self::Sale,
            SourceType::Purchase => Self::Purchase,
            SourceType::StockAdjustment => Self::StockAdjustment,
            SourceType::Reconciliation => Self::Reconciliation,
            SourceType::InterAccountTransfer => Self::InterAccountTransfer,
            SourceType::OpeningBalance => Self::OpeningBalance,
        }
    }
}

impl From<EntrySourceType> for SourceType {
    fn from(value: EntrySourceType) -> Self {
        match value {
            EntrySourceType::Sale => Self::Sale,
            EntrySourceType::Purchase => Self::Purchase,
            EntrySourceType::StockAdjustment => Self::StockAdjustment,
            EntrySourceType::Reconciliation => Self::Reconciliation,
            EntrySourceType::InterAccountTransfer => Self::InterAccountTransfer,
            EntrySourceType::OpeningBalance => Self::OpeningBalance,
        }
    }
}

/// Cashier session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum CashierSessionStatus {
    /// Open.
    #[sea_orm(string_value = "open")]
    Open,
    /// Closing.
    #[sea_orm(string_value = "closing")]
    Closing,
    /// Closed.
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl From<SessionStatus> for CashierSessionStatus {
    fn from(value: SessionStatus) -> Self {
        match value {
            SessionStatus::Open => Self::Open,
            SessionStatus::Closing => Self::Closing,
            SessionStatus::Closed => Self::Closed,
        }
    }
}

impl From<CashierSessionStatus> for SessionStatus {
    fn from(value: CashierSessionStatus) -> Self {
        match value {
            CashierSessionStatus::Open => Self::Open,
            CashierSessionStatus::Closing => Self::Closing,
            CashierSessionStatus::Closed => Self::Closed,
        }
    }
}

/// Reconciliation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ReconKind {
    /// Opening float.
    #[sea_orm(string_value = "opening")]
    Opening,
    /// Closing count.
    #[sea_orm(string_value = "closing")]
    Closing,
    /// Ad-hoc count.
    #[sea_orm(string_value = "manual")]
    Manual,
}

impl From<ReconciliationKind> for ReconKind {
    fn from(value: ReconciliationKind) -> Self {
        match value {
            ReconciliationKind::Opening => Self::Opening,
            ReconciliationKind::Closing => Self::Closing,
            ReconciliationKind::Manual => Self::Manual,
        }
    }
}

impl From<ReconKind> for ReconciliationKind {
    fn from(value: ReconKind) -> Self {
        match value {
            ReconKind::Opening => Self::Opening,
            ReconKind::Closing => Self::Closing,
            ReconKind::Manual => Self::Manual,
        }
    }
}

/// Reconciliation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ReconStatus {
    /// Recorded.
    #[sea_orm(string_value = "recorded")]
    Recorded,
    /// Posted.
    #[sea_orm(string_value = "posted")]
    Posted,
    /// Pending approval.
    #[sea_orm(string_value = "pending_approval")]
    PendingApproval,
    /// Disputed.
    #[sea_orm(string_value = "disputed")]
    Disputed,
}

impl From<ReconciliationStatus> for ReconStatus {
    fn from(value: ReconciliationStatus) -> Self {
        match value {
            ReconciliationStatus::Recorded => Self::Recorded,
            ReconciliationStatus::Posted => Self::Posted,
            ReconciliationStatus::PendingApproval => Self::PendingApproval,
            ReconciliationStatus::Disputed => Self::Disputed,
        }
    }
}

impl From<ReconStatus> for ReconciliationStatus {
    fn from(value: ReconStatus) -> Self {
        match value {
            ReconStatus::Recorded => Self::Recorded,
            ReconStatus::Posted => Self::Posted,
            ReconStatus::PendingApproval => Self::PendingApproval,
            ReconStatus::Disputed => Self::Disputed,
        }
    }
}

/// Inventory batch source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum BatchOrigin {
    /// Purchase.
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Stock adjustment.
    #[sea_orm(string_value = "stock_adjustment")]
    StockAdjustment,
    /// Opening stock.
    #[sea_orm(string_value = "opening_stock")]
    OpeningStock,
}

impl From<BatchSource> for BatchOrigin {
    fn from(value: BatchSource) -> Self {
        match value {
            BatchSource::Purchase => Self::Purchase,
            BatchSource::StockAdjustment => Self::StockAdjustment,
            BatchSource::OpeningStock => Self::OpeningStock,
        }
    }
}

impl From<BatchOrigin> for BatchSource {
    fn from(value: BatchOrigin) -> Self {
        match value {
            BatchOrigin::Purchase => Self::Purchase,
            BatchOrigin::StockAdjustment => Self::StockAdjustment,
            BatchOrigin::OpeningStock => Self::OpeningStock,
        }
    }
}

/// Inventory movement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum MovementKind {
    /// Purchase.
    #[sea_orm(string_value = "PURCHASE")]
    Purchase,
    /// Sale.
    #[sea_orm(string_value = "SALE")]
    Sale,
    /// Adjustment.
    #[sea_orm(string_value = "ADJUSTMENT")]
    Adjustment,
}

impl From<MovementType> for MovementKind {
    fn from(value: MovementType) -> Self {
        match value {
            MovementType::Purchase => Self::Purchase,
            MovementType::Sale => Self::Sale,
            MovementType::Adjustment => Self::Adjustment,
        }
    }
}

impl From<MovementKind> for MovementType {
    fn from(value: MovementKind) -> Self {
        match value {
            MovementKind::Purchase => Self::Purchase,
            MovementKind::Sale => Self::Sale,
            MovementKind::Adjustment => Self::Adjustment,
        }
    }
}

/// How a sale's COGS was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum CogsOrigin {
    /// Fully FIFO.
    #[sea_orm(string_value = "fifo")]
    Fifo,
    /// FIFO plus an estimate.
    #[sea_orm(string_value = "fifo_with_estimate")]
    FifoWithEstimate,
    /// Fully estimated.
    #[sea_orm(string_value = "wholesale_estimate")]
    WholesaleEstimate,
}

impl From<CogsSource> for CogsOrigin {
    fn from(value: CogsSource) -> Self {
        match value {
            CogsSource::Fifo => Self::Fifo,
            CogsSource::FifoWithEstimate => Self::FifoWithEstimate,
            CogsSource::WholesaleEstimate => Self::WholesaleEstimate,
        }
    }
}

impl From<CogsOrigin> for CogsSource {
    fn from(value: CogsOrigin) -> Self {
        match value {
            CogsOrigin::Fifo => Self::Fifo,
            CogsOrigin::FifoWithEstimate => Self::FifoWithEstimate,
            CogsOrigin::WholesaleEstimate => Self::WholesaleEstimate,
        }
    }
}

/// Channel oversell policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum Oversell {
    /// Reject.
    #[sea_orm(string_value = "reject")]
    Reject,
    /// Cost the shortfall at the wholesale price.
    #[sea_orm(string_value = "wholesale_estimate")]
    WholesaleEstimate,
}

impl From<OversellPolicy> for Oversell {
    fn from(value: OversellPolicy) -> Self {
        match value {
            OversellPolicy::Reject => Self::Reject,
            OversellPolicy::WholesaleEstimate => Self::WholesaleEstimate,
        }
    }
}

impl From<Oversell> for OversellPolicy {
    fn from(value: Oversell) -> Self {
        match value {
            Oversell::Reject => Self::Reject,
            Oversell::WholesaleEstimate => Self::WholesaleEstimate,
        }
    }
}

/// Outbox request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum RequestType {
    /// Held reconciliation variance.
    #[sea_orm(string_value = "reconciliation_variance")]
    ReconciliationVariance,
}

impl From<ApprovalRequestType> for RequestType {
    fn from(value: ApprovalRequestType) -> Self {
        match value {
            ApprovalRequestType::ReconciliationVariance => Self::ReconciliationVariance,
        }
    }
}

impl From<RequestType> for ApprovalRequestType {
    fn from(value: RequestType) -> Self {
        match value {
            RequestType::ReconciliationVariance => Self::ReconciliationVariance,
        }
    }
}

/// Outbox request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum RequestStatus {
    /// Pending.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Rejected.
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl From<ApprovalStatus> for RequestStatus {
    fn from(value: ApprovalStatus) -> Self {
        match value {
            ApprovalStatus::Pending => Self::Pending,
            ApprovalStatus::Approved => Self::Approved,
            ApprovalStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<RequestStatus> for ApprovalStatus {
    fn from(value: RequestStatus) -> Self {
        match value {
            RequestStatus::Pending => Self::Pending,
            RequestStatus::Approved => Self::Approved,
            RequestStatus::Rejected => Self::Rejected,
        }
    }
}
