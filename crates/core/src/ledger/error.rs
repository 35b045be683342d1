//! Ledger error types for posting and lookup failures.
//!
//! Every variant is detected before anything is written: a failed post leaves
//! no entry, line or tag behind.

use tally_shared::types::{AccountId, ChannelId, Cents, JournalEntryId};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    /// Line amount cannot be zero.
    #[error("Line {position} has a zero amount")]
    ZeroAmount {
        /// Zero-based position of the offending line.
        position: usize,
    },

    /// Lines do not sum to zero.
    #[error("Journal entry is not balanced: lines sum to {sum} cents")]
    UnbalancedEntry {
        /// Signed sum of all lines, in cents.
        sum: Cents,
    },

    /// Line amounts overflow the supported range.
    #[error("Journal entry amounts overflow the supported range")]
    AmountOverflow,

    /// Source id is empty or longer than 128 characters.
    #[error("Source id must be 1-128 characters, got {0}")]
    InvalidSourceId(usize),

    /// Account code is not upper-case `[A-Z0-9_]`, 1-64 characters.
    #[error("Invalid account code: {0:?}")]
    InvalidAccountCode(String),

    /// Transfer amount must be positive.
    #[error("Transfer amount must be positive, got {0}")]
    NonPositiveTransfer(Cents),

    /// Line metadata is malformed or uses an unknown key.
    #[error("Invalid line metadata: {0}")]
    InvalidMetadata(String),

    // ========== Account Errors ==========
    /// Referenced account does not exist.
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Referenced account belongs to another channel.
    #[error("Account {account_id} belongs to channel {account_channel}, not {entry_channel}")]
    ChannelMismatch {
        /// The account that was referenced.
        account_id: AccountId,
        /// The account's own channel.
        account_channel: ChannelId,
        /// The channel of the entry being posted.
        entry_channel: ChannelId,
    },

    /// Account code already exists in the channel.
    #[error("Account code '{0}' already exists in this channel")]
    DuplicateAccountCode(String),

    // ========== Entry Errors ==========
    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::ZeroAmount { .. } => "ZERO_AMOUNT",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::InvalidSourceId(_) => "INVALID_SOURCE_ID",
            Self::InvalidAccountCode(_) => "INVALID_ACCOUNT_CODE",
            Self::NonPositiveTransfer(_) => "NON_POSITIVE_TRANSFER",
            Self::InvalidMetadata(_) => "INVALID_METADATA",
            Self::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            Self::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
            Self::DuplicateAccountCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InsufficientLines
            | Self::ZeroAmount { .. }
            | Self::AmountOverflow
            | Self::InvalidSourceId(_)
            | Self::InvalidAccountCode(_)
            | Self::NonPositiveTransfer(_)
            | Self::InvalidMetadata(_) => 400,

            // 404 Not Found
            Self::EntryNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateAccountCode(_) => 409,

            // 422 Unprocessable - well-formed but violates ledger rules
            Self::UnbalancedEntry { .. }
            | Self::UnknownAccount(_)
            | Self::ChannelMismatch { .. } => 422,

            // 500 Internal Server Error
            Self::Database(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Postings are never retried automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}
