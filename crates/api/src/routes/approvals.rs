//! Variance approval routes.
//!
//! The external approval system polls the outbox for pending requests and
//! delivers its decision back through the decision callback.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tally_core::approval::{ApprovalDecision, ApprovalError};
use tally_db::{ResolutionOutcome, StoredApprovalRequest};
use tally_shared::types::{ApprovalRequestId, ReconciliationId};
use tally_shared::{AppError, Capability};
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::CurrentActor;

/// Creates the approval routes (requires the actor middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals/pending", get(list_pending))
        .route("/approvals/decisions", post(decide))
        .route("/approvals/resend", post(resend_missing))
        .route("/approvals/{request_id}", get(get_request))
}

/// Decision callback payload.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// The held reconciliation.
    pub reconciliation_id: ReconciliationId,
    /// `approved` or `rejected`.
    pub decision: String,
}

/// Held reconciliations whose approval request was raised again.
#[derive(Debug, Serialize)]
pub struct ResendResponse {
    /// Reconciliations that now carry a request.
    pub raised: Vec<ReconciliationId>,
}

/// GET `/approvals/pending` - Requests awaiting a decision, oldest first.
async fn list_pending(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<Json<Vec<StoredApprovalRequest>>> {
    actor.require(Capability::ApproveVariance)?;
    Ok(Json(state.outbox.list_pending().await?))
}

/// GET `/approvals/{request_id}` - Get one request.
async fn get_request(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(request_id): Path<ApprovalRequestId>,
) -> ApiResult<Json<StoredApprovalRequest>> {
    actor.require(Capability::ApproveVariance)?;
    let request = state
        .outbox
        .find(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("approval request {request_id}")))?;
    Ok(Json(request))
}

/// POST `/approvals/resend` - Raise requests for holds that lack one.
async fn resend_missing(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> ApiResult<Json<ResendResponse>> {
    actor.require(Capability::ManageReconciliation)?;
    let raised = state.reconciliations.request_missing_approvals().await?;
    Ok(Json(ResendResponse { raised }))
}

/// POST `/approvals/decisions` - Apply a decision to a held reconciliation.
async fn decide(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<Json<ResolutionOutcome>> {
    actor.require(Capability::ApproveVariance)?;

    let decision = ApprovalDecision::parse(body.decision.trim())
        .ok_or_else(|| ApprovalError::InvalidDecision(body.decision.clone()))?;

    let outcome = state
        .reconciliations
        .resolve(body.reconciliation_id, decision, actor.id())
        .await?;

    info!(
        reconciliation_id = %body.reconciliation_id,
        actor_id = %actor.id(),
        status = outcome.reconciliation.status.as_str(),
        "Approval decision applied"
    );
    Ok(Json(outcome))
}

#[cfg(test)]
mod integration_tests {
    use serde_json::{Value, json};

    use crate::test_support::TestApp;

    async fn held_close(app: &TestApp) -> Value {
        let (_, opened) = app
            .send(
                "POST",
                &format!("/api/v1/channels/{}/sessions", app.channel),
                Some(json!({ "till_id": "till-1", "declared": { "CASH": 10_000 } })),
            )
            .await;
        let session_id = opened["session"]["id"].as_str().unwrap();

        let (status, closed) = app
            .send(
                "POST",
                &format!("/api/v1/sessions/{session_id}/close"),
                Some(json!({ "declared": { "CASH": 15_000 } })),
            )
            .await;
        assert_eq!(status, 202);
        closed
    }

    #[tokio::test]
    async fn test_approval_closes_the_session() {
        let app = TestApp::new().await;
        let closed = held_close(&app).await;
        let reconciliation_id = closed["reconciliation"]["id"].clone();

        let (status, pending) = app.send("GET", "/api/v1/approvals/pending", None).await;
        assert_eq!(status, 200);
        assert_eq!(pending.as_array().unwrap().len(), 1);
        assert_eq!(pending[0]["entity_id"], reconciliation_id);
        assert_eq!(pending[0]["metadata"]["shortOverCents"], -5_000);

        let request_id = pending[0]["id"].as_str().unwrap();
        let (status, request) = app
            .send("GET", &format!("/api/v1/approvals/{request_id}"), None)
            .await;
        assert_eq!(status, 200);
        assert_eq!(request["status"], "pending");

        let (status, outcome) = app
            .send(
                "POST",
                "/api/v1/approvals/decisions",
                Some(json!({ "reconciliation_id": reconciliation_id, "decision": "approved" })),
            )
            .await;
        assert_eq!(status, 200);
        assert_eq!(outcome["reconciliation"]["status"], "posted");
        assert_eq!(outcome["session"]["status"], "closed");

        let (_, pending) = app.send("GET", "/api/v1/approvals/pending", None).await;
        assert!(pending.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_keeps_the_session_closing() {
        let app = TestApp::new().await;
        let closed = held_close(&app).await;

        let (status, outcome) = app
            .send(
                "POST",
                "/api/v1/approvals/decisions",
                Some(json!({
                    "reconciliation_id": closed["reconciliation"]["id"],
                    "decision": "rejected"
                })),
            )
            .await;

        assert_eq!(status, 200);
        assert_eq!(outcome["reconciliation"]["status"], "disputed");
        assert_eq!(outcome["session"]["status"], "closing");
    }

    #[tokio::test]
    async fn test_unknown_decision_is_rejected() {
        let app = TestApp::new().await;
        let closed = held_close(&app).await;

        let (status, body) = app
            .send(
                "POST",
                "/api/v1/approvals/decisions",
                Some(json!({
                    "reconciliation_id": closed["reconciliation"]["id"],
                    "decision": "maybe"
                })),
            )
            .await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "INVALID_APPROVAL_DECISION");
    }

    #[tokio::test]
    async fn test_deciding_needs_approver() {
        let app = TestApp::new().await;
        let closed = held_close(&app).await;

        let (status, _) = app
            .send_as(
                "POST",
                "/api/v1/approvals/decisions",
                Some(json!({
                    "reconciliation_id": closed["reconciliation"]["id"],
                    "decision": "approved"
                })),
                Some("manage_reconciliation"),
            )
            .await;

        assert_eq!(status, 403);
    }

    #[tokio::test]
    async fn test_resend_finds_nothing_when_outbox_holds() {
        let app = TestApp::new().await;
        held_close(&app).await;

        let (status, body) = app.send("POST", "/api/v1/approvals/resend", None).await;
        assert_eq!(status, 200);
        assert!(body["raised"].as_array().unwrap().is_empty());

        let (status, _) = app
            .send_as("POST", "/api/v1/approvals/resend", None, Some("approve_variance"))
            .await;
        assert_eq!(status, 403);
    }
}
