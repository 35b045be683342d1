//! Channel-scoped double-entry bookkeeping logic.
//!
//! This module implements the posting rules of the ledger:
//! - Chart of accounts codes and the default chart
//! - Typed, versioned line metadata
//! - Journal entry and line types
//! - Entry validation (balance, channel, account existence)
//! - Balance query types
//! - Error types for ledger operations

pub mod account;
pub mod balance;
pub mod error;
pub mod metadata;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use account::{AccountCode, AccountInfo, AccountRef, DEFAULT_ACCOUNTS, DefaultAccount};
pub use balance::{AccountBalance, BalanceScope};
pub use error::LedgerError;
pub use metadata::{LineMetadata, MetadataKey};
pub use service::LedgerService;
pub use types::{
    JournalEntry, JournalLine, PostEntryInput, PostLineInput, ResolvedLine, SourceType,
    TransferInput, ValidatedEntry,
};
