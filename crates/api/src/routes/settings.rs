//! Per-channel policy settings routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Deserialize;
use tally_core::channel::{ChannelSettings, ResolvedChannelSettings};
use tally_core::costing::OversellPolicy;
use tally_shared::Capability;
use tally_shared::types::{Cents, ChannelId};

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::CurrentActor;

/// Creates the settings routes (requires the actor middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/channels/{channel_id}/settings",
        get(get_settings).put(update_settings),
    )
}

/// Request body for replacing a channel's settings.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// Largest absolute variance posted without approval, in cents.
    pub variance_notification_threshold_cents: i64,
    /// What a sale does when FIFO stock runs out.
    pub oversell_policy: OversellPolicy,
}

/// GET `/channels/{channel_id}/settings` - Effective settings.
async fn get_settings(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
) -> ApiResult<Json<ResolvedChannelSettings>> {
    Ok(Json(state.settings.get_or_default(channel_id).await?))
}

/// PUT `/channels/{channel_id}/settings` - Replace the channel's settings.
async fn update_settings(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<ResolvedChannelSettings>> {
    actor.require(Capability::ApproveVariance)?;

    let resolved = state
        .settings
        .upsert(
            channel_id,
            ChannelSettings {
                variance_notification_threshold: Cents::new(
                    body.variance_notification_threshold_cents,
                ),
                oversell_policy: body.oversell_policy,
            },
        )
        .await?;

    Ok(Json(resolved))
}
