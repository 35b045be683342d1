//! Domain types for journal entry posting.
//!
//! These types are used for input/output of the posting path and are
//! separate from database entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, ActorId, ChannelId, Cents, JournalEntryId, JournalLineId};

use super::account::{AccountCode, AccountRef};
use super::metadata::LineMetadata;

/// Maximum length of a journal entry source id.
pub const MAX_SOURCE_ID_LEN: usize = 128;

/// What caused a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A sale and its cost of goods sold.
    Sale,
    /// An inventory purchase.
    Purchase,
    /// A stock correction or write-off.
    StockAdjustment,
    /// A reconciliation short/over adjustment.
    Reconciliation,
    /// A movement between two accounts in the same channel.
    InterAccountTransfer,
    /// An opening balance load.
    OpeningBalance,
}

impl SourceType {
    /// Returns the string representation of the source type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::StockAdjustment => "stock_adjustment",
            Self::Reconciliation => "reconciliation",
            Self::InterAccountTransfer => "inter_account_transfer",
            Self::OpeningBalance => "opening_balance",
        }
    }

    /// Parses a source type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(Self::Sale),
            "purchase" => Some(Self::Purchase),
            "stock_adjustment" => Some(Self::StockAdjustment),
            "reconciliation" => Some(Self::Reconciliation),
            "inter_account_transfer" => Some(Self::InterAccountTransfer),
            "opening_balance" => Some(Self::OpeningBalance),
            _ => None,
        }
    }
}

/// A single line of a journal entry before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostLineInput {
    /// Account to post against.
    pub account: AccountRef,
    /// Signed amount: positive is a debit, negative a credit.
    pub amount: Cents,
    /// Metadata tags.
    #[serde(default)]
    pub metadata: LineMetadata,
}

impl PostLineInput {
    /// Creates a line without metadata.
    #[must_use]
    pub fn new(account: impl Into<AccountRef>, amount: Cents) -> Self {
        Self {
            account: account.into(),
            amount,
            metadata: LineMetadata::new(),
        }
    }

    /// Attaches metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: LineMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Input for posting a journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEntryInput {
    /// Channel the entry belongs to.
    pub channel_id: ChannelId,
    /// What caused the entry.
    pub source_type: SourceType,
    /// Identifier of the cause, possibly composite.
    pub source_id: String,
    /// When the event happened (defaults to now).
    pub occurred_at: Option<DateTime<Utc>>,
    /// Free-form memo.
    pub memo: Option<String>,
    /// Actor who posted the entry, if any.
    pub posted_by: Option<ActorId>,
    /// Ordered lines.
    pub lines: Vec<PostLineInput>,
}

/// A line whose account has been resolved and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// Resolved account.
    pub account_id: AccountId,
    /// Resolved account code.
    pub account_code: AccountCode,
    /// Signed amount.
    pub amount: Cents,
    /// Zero-based position within the entry.
    pub position: u32,
    /// Metadata tags.
    pub metadata: LineMetadata,
}

/// An entry that passed every posting rule and is ready to persist.
#[derive(Debug, Clone)]
pub struct ValidatedEntry {
    /// Channel the entry belongs to.
    pub channel_id: ChannelId,
    /// What caused the entry.
    pub source_type: SourceType,
    /// Identifier of the cause.
    pub source_id: String,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
    /// Free-form memo.
    pub memo: Option<String>,
    /// Actor who posted the entry.
    pub posted_by: Option<ActorId>,
    /// Resolved lines. Their amounts sum to zero.
    pub lines: Vec<ResolvedLine>,
}

/// A stored journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Line id.
    pub id: JournalLineId,
    /// Owning entry.
    pub entry_id: JournalEntryId,
    /// Account posted against.
    pub account_id: AccountId,
    /// Account code at the time of posting.
    pub account_code: AccountCode,
    /// Signed amount.
    pub amount: Cents,
    /// Zero-based position within the entry.
    pub position: u32,
    /// When the entry happened.
    pub occurred_at: DateTime<Utc>,
    /// Metadata tags, upgraded to the current schema.
    pub metadata: LineMetadata,
}

/// A stored journal entry with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Entry id.
    pub id: JournalEntryId,
    /// Channel the entry belongs to.
    pub channel_id: ChannelId,
    /// What caused the entry.
    pub source_type: SourceType,
    /// Identifier of the cause.
    pub source_id: String,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
    /// Free-form memo.
    pub memo: Option<String>,
    /// Actor who posted the entry.
    pub posted_by: Option<ActorId>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// Lines in position order.
    pub lines: Vec<JournalLine>,
}

/// Input for moving an amount between two accounts of one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferInput {
    /// Channel both accounts belong to.
    pub channel_id: ChannelId,
    /// Account the amount leaves (credited).
    pub from: AccountRef,
    /// Account the amount arrives in (debited).
    pub to: AccountRef,
    /// Positive amount to move.
    pub amount: Cents,
    /// Free-form memo.
    pub memo: Option<String>,
    /// Actor requesting the transfer.
    pub posted_by: Option<ActorId>,
}
