//! Cashier session domain types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{ActorId, ChannelId, Cents, ReconciliationId, SessionId};

use crate::ledger::AccountCode;
use crate::reconciliation::Reconciliation;

/// Maximum length of a till id.
pub const MAX_TILL_ID_LEN: usize = 64;

/// Cashier session status.
///
/// The valid transitions are:
/// - Open → Closed (close within threshold)
/// - Open → Closing (close held for approval)
/// - Closing → Closed (approval granted)
/// - Closing → Closing (re-count after a rejection, held again)
///
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Till is trading.
    Open,
    /// Closing count is held for approval or awaiting a re-count.
    Closing,
    /// Session finished.
    Closed,
}

impl SessionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closing" => Some(Self::Closing),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored cashier session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashierSession {
    /// Session id.
    pub id: SessionId,
    /// Channel.
    pub channel_id: ChannelId,
    /// Physical till.
    pub till_id: String,
    /// Actor who opened the session.
    pub opened_by: ActorId,
    /// When the session opened.
    pub opened_at: DateTime<Utc>,
    /// Actor who counted the latest close.
    pub closed_by: Option<ActorId>,
    /// When the session closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Opening float reconciliation.
    pub opening_reconciliation_id: ReconciliationId,
    /// Latest closing reconciliation.
    pub closing_reconciliation_id: Option<ReconciliationId>,
}

/// Input for opening a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSessionInput {
    /// Channel.
    pub channel_id: ChannelId,
    /// Physical till.
    pub till_id: String,
    /// Opening float per account.
    pub declared: BTreeMap<AccountCode, Cents>,
}

/// Input for closing a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseSessionInput {
    /// Closing count per account.
    pub declared: BTreeMap<AccountCode, Cents>,
}

/// Result of opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionOutcome {
    /// The new session.
    pub session: CashierSession,
    /// Its opening reconciliation.
    pub opening: Reconciliation,
}

/// Result of closing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSessionOutcome {
    /// The session after the close.
    pub session: CashierSession,
    /// The closing reconciliation.
    pub reconciliation: Reconciliation,
    /// True if the session is held in `Closing` for approval.
    pub approval_required: bool,
}
