//! Cashier session routes.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tally_core::ledger::AccountCode;
use tally_core::session::{
    CashierSession, CloseSessionInput, CloseSessionOutcome, OpenSessionInput, OpenSessionOutcome,
};
use tally_shared::Capability;
use tally_shared::types::{Cents, ChannelId, SessionId};

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::CurrentActor;

/// Creates the session routes (requires the actor middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels/{channel_id}/sessions", post(open_session))
        .route("/sessions/{session_id}", get(get_session))
        .route("/sessions/{session_id}/close", post(close_session))
}

/// Request body for opening a till.
#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    /// Till the session runs on.
    pub till_id: String,
    /// Opening float per account, in cents.
    #[serde(default)]
    pub declared: BTreeMap<AccountCode, Cents>,
}

/// Request body for closing a till.
#[derive(Debug, Deserialize)]
pub struct CloseSessionRequest {
    /// Closing count per manually counted account, in cents.
    #[serde(default)]
    pub declared: BTreeMap<AccountCode, Cents>,
}

/// POST `/channels/{channel_id}/sessions` - Open a till.
async fn open_session(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<OpenSessionRequest>,
) -> ApiResult<(StatusCode, Json<OpenSessionOutcome>)> {
    actor.require(Capability::ManageReconciliation)?;

    let outcome = state
        .sessions
        .open(
            OpenSessionInput {
                channel_id,
                till_id: body.till_id,
                declared: body.declared,
            },
            actor.id(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET `/sessions/{session_id}` - Get a session.
async fn get_session(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<CashierSession>> {
    Ok(Json(state.sessions.get(session_id).await?))
}

/// POST `/sessions/{session_id}/close` - Close a till against a count.
///
/// A variance above the channel threshold answers 202 with the session held
/// in `closing` until the variance is decided.
async fn close_session(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(session_id): Path<SessionId>,
    Json(body): Json<CloseSessionRequest>,
) -> ApiResult<(StatusCode, Json<CloseSessionOutcome>)> {
    actor.require(Capability::ManageReconciliation)?;

    let outcome = state
        .sessions
        .close(
            session_id,
            CloseSessionInput {
                declared: body.declared,
            },
            actor.id(),
        )
        .await?;

    let status = if outcome.approval_required {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}
