//! Pre-authenticated actor identity and capabilities.
//!
//! Authentication happens upstream. The core only receives who is acting and
//! which capabilities the caller has already been granted.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ActorId;

/// A capability granted to an actor by the authenticating gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May open and close cashier sessions and take reconciliation snapshots.
    ManageReconciliation,
    /// May approve or reject held reconciliation variances.
    ApproveVariance,
    /// May post manual journal entries and transfers, and manage accounts.
    PostEntries,
    /// May record purchases, sales and write-offs.
    ManageInventory,
}

impl Capability {
    /// All known capabilities.
    pub const ALL: [Self; 4] = [
        Self::ManageReconciliation,
        Self::ApproveVariance,
        Self::PostEntries,
        Self::ManageInventory,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageReconciliation => "manage_reconciliation",
            Self::ApproveVariance => "approve_variance",
            Self::PostEntries => "post_entries",
            Self::ManageInventory => "manage_inventory",
        }
    }

    /// Parses a comma-separated capability list, ignoring blanks and unknown names.
    #[must_use]
    pub fn parse_list(raw: &str) -> BTreeSet<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown capability: {s}"))
    }
}

/// The authenticated actor performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor id as asserted by the gateway.
    pub id: ActorId,
    /// Capabilities the gateway has granted.
    pub capabilities: BTreeSet<Capability>,
}

impl Actor {
    /// Creates an actor with the given capabilities.
    #[must_use]
    pub fn new(id: ActorId, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            id,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// Returns true if the actor holds the capability.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_round_trip_names() {
        for cap in Capability::ALL {
            assert_eq!(cap.as_str().parse::<Capability>().unwrap(), cap);
        }
    }

    #[test]
    fn test_parse_list_skips_unknown() {
        let caps = Capability::parse_list(" approve_variance, bogus,,MANAGE_INVENTORY ");
        assert_eq!(caps.len(), 2);
        assert!(caps.contains(&Capability::ApproveVariance));
        assert!(caps.contains(&Capability::ManageInventory));
    }

    #[test]
    fn test_actor_has() {
        let actor = Actor::new(ActorId::new(), [Capability::PostEntries]);
        assert!(actor.has(Capability::PostEntries));
        assert!(!actor.has(Capability::ApproveVariance));
    }
}
