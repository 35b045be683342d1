//! `SeaORM` Entity for sale_cogs table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::CogsOrigin;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sale_cogs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub channel_id: Uuid,
    pub order_id: String,
    pub order_line_id: String,
    pub variant_id: Uuid,
    pub stock_location_id: Uuid,
    pub sale_date: DateTimeUtc,
    pub quantity: i64,
    pub cogs_cents: i64,
    pub source: CogsOrigin,
    pub estimated_quantity: i64,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
