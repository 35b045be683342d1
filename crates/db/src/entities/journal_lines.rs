//! `SeaORM` Entity for journal_lines table.
//!
//! `channel_id` and `occurred_at` are copied from the entry so balance
//! queries use the `(channel_id, account_id, occurred_at)` index alone.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entry_id: Uuid,
    pub channel_id: Uuid,
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub position: i32,
    pub occurred_at: DateTimeUtc,
    pub metadata_version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::journal_entries::Entity",
        from = "Column::EntryId",
        to = "super::journal_entries::Column::Id"
    )]
    JournalEntries,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
    #[sea_orm(has_many = "super::journal_line_tags::Entity")]
    JournalLineTags,
}

impl Related<super::journal_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntries.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::journal_line_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalLineTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
