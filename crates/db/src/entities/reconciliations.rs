//! `SeaORM` Entity for reconciliations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ReconKind, ReconStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub channel_id: Uuid,
    pub kind: ReconKind,
    pub status: ReconStatus,
    pub snapshot_at: DateTimeUtc,
    pub session_id: Option<Uuid>,
    pub counted_by: Uuid,
    pub adjustment_entry_id: Option<Uuid>,
    pub approval_request_id: Option<Uuid>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reconciliation_accounts::Entity")]
    ReconciliationAccounts,
}

impl Related<super::reconciliation_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReconciliationAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
