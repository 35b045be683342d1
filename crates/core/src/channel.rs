//! Per-channel policy settings.

use serde::{Deserialize, Serialize};
use tally_shared::types::{Cents, ChannelId};

use crate::costing::OversellPolicy;

/// Policy knobs a channel may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Per-account variance above which a reconciliation is held.
    pub variance_notification_threshold: Cents,
    /// What a sale does when batches run out.
    pub oversell_policy: OversellPolicy,
}

impl ChannelSettings {
    /// Settings used for channels without their own row.
    #[must_use]
    pub const fn defaults(threshold: Cents, oversell_policy: OversellPolicy) -> Self {
        Self {
            variance_notification_threshold: threshold,
            oversell_policy,
        }
    }
}

/// Settings resolved for a specific channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChannelSettings {
    /// Channel.
    pub channel_id: ChannelId,
    /// Effective settings.
    #[serde(flatten)]
    pub settings: ChannelSettings,
    /// False when the configured defaults were used.
    pub customized: bool,
}
