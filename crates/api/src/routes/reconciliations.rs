//! Reconciliation snapshot routes.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tally_core::ledger::AccountCode;
use tally_core::reconciliation::{Reconciliation, SnapshotInput, SnapshotOutcome};
use tally_shared::Capability;
use tally_shared::types::{Cents, ChannelId, PageRequest, PageResponse, ReconciliationId, SessionId};

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::CurrentActor;

/// Creates the reconciliation routes (requires the actor middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/channels/{channel_id}/reconciliations",
            get(list_reconciliations).post(create_snapshot),
        )
        .route("/reconciliations/{reconciliation_id}", get(get_reconciliation))
}

/// Request body for an ad-hoc snapshot.
#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    /// Accounts in scope.
    pub accounts: Vec<AccountCode>,
    /// Counted balance per manually counted account, in cents.
    #[serde(default)]
    pub declared: BTreeMap<AccountCode, Cents>,
    /// Session whose tagged lines bound the expected balances.
    pub session_id: Option<SessionId>,
}

/// POST `/channels/{channel_id}/reconciliations` - Take a snapshot.
async fn create_snapshot(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<SnapshotRequest>,
) -> ApiResult<(StatusCode, Json<SnapshotOutcome>)> {
    actor.require(Capability::ManageReconciliation)?;

    let outcome = state
        .reconciliations
        .snapshot(
            SnapshotInput {
                channel_id,
                accounts: body.accounts,
                declared: body.declared,
                session_id: body.session_id,
            },
            actor.id(),
        )
        .await?;

    let status = if outcome.approval_required {
        StatusCode::ACCEPTED
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

/// GET `/channels/{channel_id}/reconciliations` - Newest first.
async fn list_reconciliations(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<Reconciliation>>> {
    Ok(Json(state.reconciliations.list(channel_id, &page).await?))
}

/// GET `/reconciliations/{reconciliation_id}` - Get a reconciliation.
async fn get_reconciliation(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(reconciliation_id): Path<ReconciliationId>,
) -> ApiResult<Json<Reconciliation>> {
    Ok(Json(state.reconciliations.get(reconciliation_id).await?))
}
