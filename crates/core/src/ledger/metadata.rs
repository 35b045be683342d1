//! Typed, versioned metadata attached to journal lines.
//!
//! Keys form a closed set. Each line records the schema version it was
//! written with, and older payloads are upgraded on the way in, so a key
//! rename is a schema migration rather than a silent change.
//!
//! Version history:
//! - v1: session tag stored as `cashierSessionId`
//! - v2: session tag renamed to `openSessionId`

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Maximum length of a metadata tag value.
pub const MAX_TAG_VALUE_LEN: usize = 128;

/// A metadata key usable for tag-based line lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataKey {
    /// Cashier session the line was posted under.
    OpenSessionId,
    /// Reconciliation that produced the line.
    ReconciliationId,
    /// Order the line belongs to.
    OrderId,
    /// Order line the line belongs to.
    OrderLineId,
    /// Inventory batch the line relates to.
    BatchId,
    /// Inter-account transfer the line belongs to.
    TransferId,
}

impl MetadataKey {
    /// All keys in the current schema.
    pub const ALL: [Self; 6] = [
        Self::OpenSessionId,
        Self::ReconciliationId,
        Self::OrderId,
        Self::OrderLineId,
        Self::BatchId,
        Self::TransferId,
    ];

    /// Returns the key's name in the current schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenSessionId => "openSessionId",
            Self::ReconciliationId => "reconciliationId",
            Self::OrderId => "orderId",
            Self::OrderLineId => "orderLineId",
            Self::BatchId => "batchId",
            Self::TransferId => "transferId",
        }
    }

    /// Parses a key name written under the given schema version.
    #[must_use]
    pub fn parse_versioned(name: &str, version: u16) -> Option<Self> {
        if version <= 1 && name == "cashierSessionId" {
            return Some(Self::OpenSessionId);
        }
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Parses a key name in the current schema.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::parse_versioned(name, LineMetadata::CURRENT_VERSION)
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata tags on a single journal line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct LineMetadata {
    tags: BTreeMap<MetadataKey, String>,
}

impl LineMetadata {
    /// Schema version written with every new line.
    pub const CURRENT_VERSION: u16 = 2;

    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag, replacing any previous value for the key.
    #[must_use]
    pub fn with(mut self, key: MetadataKey, value: impl Into<String>) -> Self {
        self.tags.insert(key, value.into());
        self
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: MetadataKey) -> Option<&str> {
        self.tags.get(&key).map(String::as_str)
    }

    /// Iterates over tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (MetadataKey, &str)> {
        self.tags.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Returns true if there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Builds metadata from raw key/value pairs written under `version`,
    /// upgrading legacy key names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetadata` for unknown keys, duplicate keys after the
    /// upgrade, empty or over-long values, or a version newer than this build.
    pub fn from_versioned<I, K, V>(version: u16, pairs: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        if version > Self::CURRENT_VERSION {
            return Err(LedgerError::InvalidMetadata(format!(
                "schema version {version} is newer than supported version {}",
                Self::CURRENT_VERSION
            )));
        }

        let mut tags = BTreeMap::new();
        for (name, value) in pairs {
            let name = name.as_ref();
            let key = MetadataKey::parse_versioned(name, version)
                .ok_or_else(|| LedgerError::InvalidMetadata(format!("unknown key {name:?}")))?;
            let value = value.into();
            if value.is_empty() || value.chars().count() > MAX_TAG_VALUE_LEN {
                return Err(LedgerError::InvalidMetadata(format!(
                    "value for {key} must be 1-{MAX_TAG_VALUE_LEN} characters"
                )));
            }
            if tags.insert(key, value).is_some() {
                return Err(LedgerError::InvalidMetadata(format!("duplicate key {key}")));
            }
        }
        Ok(Self { tags })
    }
}

/// Incoming payloads may use any supported schema version's names.
impl TryFrom<BTreeMap<String, String>> for LineMetadata {
    type Error = LedgerError;

    fn try_from(raw: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let version = if raw.contains_key("cashierSessionId") { 1 } else { Self::CURRENT_VERSION };
        Self::from_versioned(version, raw)
    }
}

impl From<LineMetadata> for BTreeMap<String, String> {
    fn from(metadata: LineMetadata) -> Self {
        metadata
            .tags
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect()
    }
}
