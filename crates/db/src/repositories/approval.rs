//! Approval request outbox.
//!
//! The default [`ApprovalGateway`]: requests are written to the
//! `approval_requests` table, where the external workflow picks them up.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use tally_core::approval::{
    ApprovalDecision, ApprovalError, ApprovalGateway, ApprovalRequest, ApprovalRequestType,
    ApprovalStatus,
};
use tally_shared::types::{ActorId, ApprovalRequestId};
use tracing::info;
use uuid::Uuid;

use crate::entities::approval_requests;
use crate::entities::sea_orm_active_enums::RequestStatus;
use crate::error::DbFailure;

/// A stored outbox row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredApprovalRequest {
    /// Request id.
    pub id: ApprovalRequestId,
    /// What is being approved.
    pub request_type: ApprovalRequestType,
    /// The entity's id.
    pub entity_id: Uuid,
    /// Context for the approver.
    pub metadata: serde_json::Value,
    /// Request status.
    pub status: ApprovalStatus,
    /// Who decided.
    pub decided_by: Option<ActorId>,
    /// When the decision was recorded.
    pub decided_at: Option<DateTime<Utc>>,
    /// When the request was raised.
    pub created_at: DateTime<Utc>,
}

/// Where held reconciliations raise their approval requests.
#[derive(Clone)]
pub enum ApprovalRoute {
    /// Write the request to the outbox in the transaction that holds the
    /// reconciliation.
    Outbox,
    /// Hand the request to an external gateway once the hold has committed.
    Gateway(Arc<dyn ApprovalGateway>),
}

impl std::fmt::Debug for ApprovalRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outbox => f.write_str("Outbox"),
            Self::Gateway(_) => f.write_str("Gateway"),
        }
    }
}

/// Outbox-backed approval gateway.
#[derive(Debug, Clone)]
pub struct ApprovalOutbox {
    db: DatabaseConnection,
}

impl ApprovalOutbox {
    /// Creates a new outbox.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists requests awaiting a decision, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_pending(&self) -> Result<Vec<StoredApprovalRequest>, ApprovalError> {
        let rows = approval_requests::Entity::find()
            .filter(approval_requests::Column::Status.eq(RequestStatus::Pending))
            .order_by_asc(approval_requests::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(ApprovalError::from_db)?;
        Ok(rows.into_iter().map(to_stored).collect())
    }

    /// Gets a request by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(
        &self,
        id: ApprovalRequestId,
    ) -> Result<Option<StoredApprovalRequest>, ApprovalError> {
        let row = approval_requests::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(ApprovalError::from_db)?;
        Ok(row.map(to_stored))
    }

    /// Writes a pending request on the given connection.
    pub(crate) async fn enqueue_in<C: ConnectionTrait>(
        conn: &C,
        request: ApprovalRequest,
    ) -> Result<ApprovalRequestId, ApprovalError> {
        let id = ApprovalRequestId::new();
        approval_requests::ActiveModel {
            id: Set(id.into_inner()),
            request_type: Set(request.request_type.into()),
            entity_id: Set(request.entity_id),
            metadata: Set(request.metadata),
            status: Set(RequestStatus::Pending),
            decided_by: Set(None),
            decided_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(ApprovalError::from_db)?;

        info!(
            request_id = %id,
            entity_id = %request.entity_id,
            request_type = request.request_type.as_str(),
            "Approval requested"
        );
        Ok(id)
    }

    /// Marks the pending request for an entity as decided.
    pub(crate) async fn mark_decided_in<C: ConnectionTrait>(
        conn: &C,
        entity_id: Uuid,
        decision: ApprovalDecision,
        actor: ActorId,
        at: DateTime<Utc>,
    ) -> Result<u64, ApprovalError> {
        let status = RequestStatus::from(decision.resulting_status());
        let result = approval_requests::Entity::update_many()
            .col_expr(
                approval_requests::Column::Status,
                Expr::value(status),
            )
            .col_expr(
                approval_requests::Column::DecidedBy,
                Expr::value(actor.into_inner()),
            )
            .col_expr(
                approval_requests::Column::DecidedAt,
                Expr::value(at),
            )
            .filter(approval_requests::Column::EntityId.eq(entity_id))
            .filter(approval_requests::Column::Status.eq(RequestStatus::Pending))
            .exec(conn)
            .await
            .map_err(ApprovalError::from_db)?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl ApprovalGateway for ApprovalOutbox {
    async fn request_approval(
        &self,
        request: ApprovalRequest,
    ) -> Result<ApprovalRequestId, ApprovalError> {
        Self::enqueue_in(&self.db, request).await
    }
}

fn to_stored(model: approval_requests::Model) -> StoredApprovalRequest {
    StoredApprovalRequest {
        id: ApprovalRequestId::from_uuid(model.id),
        request_type: model.request_type.into(),
        entity_id: model.entity_id,
        metadata: model.metadata,
        status: model.status.into(),
        decided_by: model.decided_by.map(ActorId::from_uuid),
        decided_at: model.decided_at,
        created_at: model.created_at,
    }
}
