//! Reconciliation domain types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    AccountId, ActorId, ApprovalRequestId, ChannelId, Cents, JournalEntryId, ReconciliationId,
    SessionId,
};

use super::error::ReconciliationError;
use crate::ledger::{AccountCode, AccountInfo, LedgerService};

/// Why a reconciliation was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationKind {
    /// Float declared when a session opens.
    Opening,
    /// Count taken when a session closes.
    Closing,
    /// Ad-hoc count outside the session lifecycle.
    Manual,
}

impl ReconciliationKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::Manual => "manual",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opening" => Some(Self::Opening),
            "closing" => Some(Self::Closing),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Reconciliation lifecycle status.
///
/// - `Recorded`: stored, nothing to post (no variance, or an opening float)
/// - `Posted`: the short/over adjustment was posted
/// - `PendingApproval`: held; adjustment deferred until a decision arrives
/// - `Disputed`: rejected; a re-count is required
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    /// Stored without an adjustment.
    Recorded,
    /// Adjustment posted.
    Posted,
    /// Held for approval.
    PendingApproval,
    /// Approval rejected.
    Disputed,
}

impl ReconciliationStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Posted => "posted",
            Self::PendingApproval => "pending_approval",
            Self::Disputed => "disputed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recorded" => Some(Self::Recorded),
            "posted" => Some(Self::Posted),
            "pending_approval" => Some(Self::PendingApproval),
            "disputed" => Some(Self::Disputed),
            _ => None,
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account in scope with its ledger-expected balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedAccount {
    /// The account.
    pub account: AccountInfo,
    /// What the ledger says should be present.
    pub expected: Cents,
}

/// One account row of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLine {
    /// The account.
    pub account_id: AccountId,
    /// The account's code.
    pub account_code: AccountCode,
    /// What the counting actor asserts is present.
    pub declared: Cents,
    /// What the ledger says should be present.
    pub expected: Cents,
    /// `declared - expected`.
    pub variance: Cents,
    /// Snapshot of the account's system flag.
    pub is_system_account: bool,
}

/// A stored reconciliation with its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Reconciliation id.
    pub id: ReconciliationId,
    /// Channel.
    pub channel_id: ChannelId,
    /// Why it was taken.
    pub kind: ReconciliationKind,
    /// Lifecycle status.
    pub status: ReconciliationStatus,
    /// The single point in time balances were read at.
    pub snapshot_at: DateTime<Utc>,
    /// Linked cashier session.
    pub session_id: Option<SessionId>,
    /// Actor who counted.
    pub counted_by: ActorId,
    /// Short/over adjustment entry, once posted.
    pub adjustment_entry_id: Option<JournalEntryId>,
    /// Outbound approval request, once sent.
    pub approval_request_id: Option<ApprovalRequestId>,
    /// Actor who approved or rejected.
    pub decided_by: Option<ActorId>,
    /// When the decision was applied.
    pub decided_at: Option<DateTime<Utc>>,
    /// Account rows in code order.
    pub lines: Vec<ReconciliationLine>,
}

impl Reconciliation {
    /// Sum of all non-system variances.
    ///
    /// # Errors
    ///
    /// Returns nested `AmountOverflow` if the variances cannot be summed.
    pub fn total_variance(&self) -> Result<Cents, ReconciliationError> {
        let variances = self
            .lines
            .iter()
            .filter(|l| !l.is_system_account)
            .map(|l| l.variance);
        Ok(LedgerService::checked_line_sum(variances)?)
    }
}

/// Input for an ad-hoc snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInput {
    /// Channel.
    pub channel_id: ChannelId,
    /// Accounts to reconcile.
    pub accounts: Vec<AccountCode>,
    /// Declared amounts for non-system accounts in scope.
    pub declared: BTreeMap<AccountCode, Cents>,
    /// Session whose tagged lines define expected balances.
    pub session_id: Option<SessionId>,
}

/// Result of taking a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOutcome {
    /// The stored reconciliation.
    pub reconciliation: Reconciliation,
    /// True if the adjustment is held for approval.
    pub approval_required: bool,
}
