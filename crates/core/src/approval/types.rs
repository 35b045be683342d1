//! Approval request and decision types.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::reconciliation::{AdjustmentBuilder, Reconciliation, ReconciliationError};
use tally_shared::types::Cents;

/// Kind of entity an approval request is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRequestType {
    /// A reconciliation whose variance exceeded the channel threshold.
    ReconciliationVariance,
}

impl ApprovalRequestType {
    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReconciliationVariance => "reconciliation_variance",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reconciliation_variance" => Some(Self::ReconciliationVariance),
            _ => None,
        }
    }
}

/// Status of an outbound approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved.
    Approved,
    /// Rejected.
    Rejected,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Decision delivered by the external approval system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Post the deferred adjustment.
    Approved,
    /// Mark the reconciliation disputed; a re-count is required.
    Rejected,
}

impl ApprovalDecision {
    /// Parses a decision from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Request status after this decision.
    #[must_use]
    pub const fn resulting_status(&self) -> ApprovalStatus {
        match self {
            Self::Approved => ApprovalStatus::Approved,
            Self::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// An outbound approval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// What kind of entity is being approved.
    pub request_type: ApprovalRequestType,
    /// The entity's id.
    pub entity_id: Uuid,
    /// Context shown to the approver.
    pub metadata: serde_json::Value,
}

impl ApprovalRequest {
    /// Build the request for a held reconciliation.
    ///
    /// # Errors
    ///
    /// Returns nested `AmountOverflow` if the variances cannot be summed.
    pub fn reconciliation_variance(
        reconciliation: &Reconciliation,
        threshold: Cents,
    ) -> Result<Self, ReconciliationError> {
        let short_over = AdjustmentBuilder::short_over_amount(&reconciliation.lines)?;
        let accounts: Vec<_> = reconciliation
            .lines
            .iter()
            .filter(|l| !l.is_system_account)
            .map(|l| {
                json!({
                    "accountCode": l.account_code,
                    "declaredCents": l.declared,
                    "expectedCents": l.expected,
                    "varianceCents": l.variance,
                })
            })
            .collect();

        Ok(Self {
            request_type: ApprovalRequestType::ReconciliationVariance,
            entity_id: reconciliation.id.into_inner(),
            metadata: json!({
                "channelId": reconciliation.channel_id,
                "sessionId": reconciliation.session_id,
                "kind": reconciliation.kind,
                "snapshotAt": reconciliation.snapshot_at,
                "thresholdCents": threshold,
                "shortOverCents": short_over,
                "accounts": accounts,
            }),
        })
    }
}
