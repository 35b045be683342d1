//! Chart of accounts: codes, references and the default channel chart.

use std::fmt;

use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, ChannelId};

use super::error::LedgerError;

/// Maximum length of an account code.
pub const MAX_ACCOUNT_CODE_LEN: usize = 64;

/// A channel-scoped account code such as `CASH` or `CLEARING_MPESA`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountCode(String);

impl AccountCode {
    /// Parses a code, requiring upper-case `[A-Z0-9_]` and 1-64 characters.
    pub fn parse(code: &str) -> Result<Self, LedgerError> {
        let valid = !code.is_empty()
            && code.len() <= MAX_ACCOUNT_CODE_LEN
            && code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
        if valid {
            Ok(Self(code.to_string()))
        } else {
            Err(LedgerError::InvalidAccountCode(code.to_string()))
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountCode> for String {
    fn from(code: AccountCode) -> Self {
        code.0
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to an account on a posted line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRef {
    /// By primary key.
    Id(AccountId),
    /// By code within the entry's channel.
    Code(AccountCode),
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Code(code) => write!(f, "{code}"),
        }
    }
}

impl From<AccountCode> for AccountRef {
    fn from(code: AccountCode) -> Self {
        Self::Code(code)
    }
}

impl From<AccountId> for AccountRef {
    fn from(id: AccountId) -> Self {
        Self::Id(id)
    }
}

/// Information about an account needed for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Channel the account belongs to.
    pub channel_id: ChannelId,
    /// Channel-scoped code.
    pub code: AccountCode,
    /// Display name.
    pub name: String,
    /// Clearing or variance account that is never declared by hand.
    pub is_system_account: bool,
}

/// An account in the default chart seeded for every new channel.
#[derive(Debug, Clone, Copy)]
pub struct DefaultAccount {
    /// Account code.
    pub code: &'static str,
    /// Display name.
    pub name: &'static str,
    /// System account flag.
    pub is_system_account: bool,
}

/// The default chart of accounts.
pub const DEFAULT_ACCOUNTS: [DefaultAccount; 8] = [
    DefaultAccount {
        code: "CASH",
        name: "Cash in till",
        is_system_account: false,
    },
    DefaultAccount {
        code: "BANK",
        name: "Bank",
        is_system_account: false,
    },
    DefaultAccount {
        code: "CLEARING_CARD",
        name: "Card settlement clearing",
        is_system_account: true,
    },
    DefaultAccount {
        code: "CLEARING_MPESA",
        name: "M-Pesa settlement clearing",
        is_system_account: true,
    },
    DefaultAccount {
        code: "SALES",
        name: "Sales revenue",
        is_system_account: false,
    },
    DefaultAccount {
        code: "INVENTORY",
        name: "Inventory",
        is_system_account: false,
    },
    DefaultAccount {
        code: "COGS",
        name: "Cost of goods sold",
        is_system_account: false,
    },
    DefaultAccount {
        code: "CASH_SHORT_OVER",
        name: "Cash short and over",
        is_system_account: true,
    },
];
