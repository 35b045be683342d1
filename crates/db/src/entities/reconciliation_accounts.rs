//! `SeaORM` Entity for reconciliation_accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliation_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub reconciliation_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: Uuid,
    pub account_code: String,
    pub declared_amount_cents: i64,
    pub expected_amount_cents: i64,
    pub variance_cents: i64,
    pub is_system_account: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reconciliations::Entity",
        from = "Column::ReconciliationId",
        to = "super::reconciliations::Column::Id"
    )]
    Reconciliations,
}

impl Related<super::reconciliations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reconciliations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
