//! Ledger migration.
//!
//! Creates channel settings, the chart of accounts, journal entries,
//! journal lines and the line tag index.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChannelSettings::Table)
                    .col(
                        ColumnDef::new(ChannelSettings::ChannelId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChannelSettings::VarianceNotificationThresholdCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChannelSettings::OversellPolicy)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChannelSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(Accounts::Code).string_len(64).not_null())
                    .col(ColumnDef::new(Accounts::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Accounts::IsSystemAccount)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Codes are unique per channel
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_channel_code")
                    .table(Accounts::Table)
                    .col(Accounts::ChannelId)
                    .col(Accounts::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JournalEntries::Table)
                    .col(
                        ColumnDef::new(JournalEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JournalEntries::ChannelId).uuid().not_null())
                    .col(
                        ColumnDef::new(JournalEntries::SourceType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JournalEntries::SourceId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JournalEntries::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JournalEntries::Memo).text())
                    .col(ColumnDef::new(JournalEntries::PostedBy).uuid())
                    .col(
                        ColumnDef::new(JournalEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_entries_source")
                    .table(JournalEntries::Table)
                    .col(JournalEntries::ChannelId)
                    .col(JournalEntries::SourceType)
                    .col(JournalEntries::SourceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JournalLines::Table)
                    .col(
                        ColumnDef::new(JournalLines::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JournalLines::EntryId).uuid().not_null())
                    .col(ColumnDef::new(JournalLines::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(JournalLines::AccountId).uuid().not_null())
                    .col(
                        ColumnDef::new(JournalLines::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JournalLines::Position).integer().not_null())
                    .col(
                        ColumnDef::new(JournalLines::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JournalLines::MetadataVersion)
                            .integer()
                            .not_null(),
                    )
                    .check(Expr::col(JournalLines::AmountCents).ne(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_lines_entry")
                            .from(JournalLines::Table, JournalLines::EntryId)
                            .to(JournalEntries::Table, JournalEntries::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_lines_account")
                            .from(JournalLines::Table, JournalLines::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Balance queries: one index covers channel, account and time bound
        manager
            .create_index(
                Index::create()
                    .name("idx_journal_lines_balance")
                    .table(JournalLines::Table)
                    .col(JournalLines::ChannelId)
                    .col(JournalLines::AccountId)
                    .col(JournalLines::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_lines_entry")
                    .table(JournalLines::Table)
                    .col(JournalLines::EntryId)
                    .col(JournalLines::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JournalLineTags::Table)
                    .col(ColumnDef::new(JournalLineTags::LineId).uuid().not_null())
                    .col(
                        ColumnDef::new(JournalLineTags::TagKey)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JournalLineTags::TagValue)
                            .string_len(128)
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(JournalLineTags::LineId)
                            .col(JournalLineTags::TagKey),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journal_line_tags_line")
                            .from(JournalLineTags::Table, JournalLineTags::LineId)
                            .to(JournalLines::Table, JournalLines::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_journal_line_tags_lookup")
                    .table(JournalLineTags::Table)
                    .col(JournalLineTags::TagKey)
                    .col(JournalLineTags::TagValue)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JournalLineTags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(JournalLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(JournalEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChannelSettings::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ChannelSettings {
    Table,
    ChannelId,
    VarianceNotificationThresholdCents,
    OversellPolicy,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    ChannelId,
    Code,
    Name,
    IsSystemAccount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum JournalEntries {
    Table,
    Id,
    ChannelId,
    SourceType,
    SourceId,
    OccurredAt,
    Memo,
    PostedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum JournalLines {
    Table,
    Id,
    EntryId,
    ChannelId,
    AccountId,
    AmountCents,
    Position,
    OccurredAt,
    MetadataVersion,
}

#[derive(DeriveIden)]
enum JournalLineTags {
    Table,
    LineId,
    TagKey,
    TagValue,
}
