//! Balance query types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, Cents};

use super::metadata::MetadataKey;

/// Which lines of an account a balance covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BalanceScope {
    /// Every line on the account.
    All,
    /// Only lines carrying the given tag.
    Tagged {
        /// Tag key.
        key: MetadataKey,
        /// Tag value.
        value: String,
    },
}

impl BalanceScope {
    /// Lines posted under one cashier session.
    #[must_use]
    pub fn session(session_id: impl ToString) -> Self {
        Self::Tagged {
            key: MetadataKey::OpenSessionId,
            value: session_id.to_string(),
        }
    }
}

/// An account balance at a point in time.
///
/// Positive balances are net debits, negative balances net credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account.
    pub account_id: AccountId,
    /// Inclusive upper bound on line `occurred_at`.
    pub as_of: DateTime<Utc>,
    /// Which lines were summed.
    pub scope: BalanceScope,
    /// Signed sum of the covered lines.
    pub balance: Cents,
}
