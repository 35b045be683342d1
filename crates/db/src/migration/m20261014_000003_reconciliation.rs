//! Reconciliation migration.
//!
//! Creates reconciliations and their account rows, cashier sessions and the
//! approval request outbox.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reconciliations::Table)
                    .col(
                        ColumnDef::new(Reconciliations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reconciliations::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(Reconciliations::Kind).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Reconciliations::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reconciliations::SnapshotAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reconciliations::SessionId).uuid())
                    .col(ColumnDef::new(Reconciliations::CountedBy).uuid().not_null())
                    .col(ColumnDef::new(Reconciliations::AdjustmentEntryId).uuid())
                    .col(ColumnDef::new(Reconciliations::ApprovalRequestId).uuid())
                    .col(ColumnDef::new(Reconciliations::DecidedBy).uuid())
                    .col(ColumnDef::new(Reconciliations::DecidedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Reconciliations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reconciliations_channel")
                    .table(Reconciliations::Table)
                    .col(Reconciliations::ChannelId)
                    .col(Reconciliations::SnapshotAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReconciliationAccounts::Table)
                    .col(
                        ColumnDef::new(ReconciliationAccounts::ReconciliationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationAccounts::AccountId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationAccounts::AccountCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationAccounts::DeclaredAmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationAccounts::ExpectedAmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationAccounts::VarianceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationAccounts::IsSystemAccount)
                            .boolean()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ReconciliationAccounts::ReconciliationId)
                            .col(ReconciliationAccounts::AccountId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reconciliation_accounts_reconciliation")
                            .from(
                                ReconciliationAccounts::Table,
                                ReconciliationAccounts::ReconciliationId,
                            )
                            .to(Reconciliations::Table, Reconciliations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CashierSessions::Table)
                    .col(
                        ColumnDef::new(CashierSessions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CashierSessions::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(CashierSessions::TillId).string_len(64).not_null())
                    .col(ColumnDef::new(CashierSessions::OpenedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(CashierSessions::OpenedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashierSessions::ClosedBy).uuid())
                    .col(ColumnDef::new(CashierSessions::ClosedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(CashierSessions::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CashierSessions::OpeningReconciliationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashierSessions::ClosingReconciliationId).uuid())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cashier_sessions_opening")
                            .from(CashierSessions::Table, CashierSessions::OpeningReconciliationId)
                            .to(Reconciliations::Table, Reconciliations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one session per till that is not closed. Partial indexes
        // share this syntax on PostgreSQL and SQLite.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX idx_cashier_sessions_active_till \
                 ON cashier_sessions (channel_id, till_id) WHERE status <> 'closed'",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApprovalRequests::Table)
                    .col(
                        ColumnDef::new(ApprovalRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApprovalRequests::RequestType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalRequests::EntityId).uuid().not_null())
                    .col(ColumnDef::new(ApprovalRequests::Metadata).json().not_null())
                    .col(
                        ColumnDef::new(ApprovalRequests::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalRequests::DecidedBy).uuid())
                    .col(ColumnDef::new(ApprovalRequests::DecidedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ApprovalRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_approval_requests_pending")
                    .table(ApprovalRequests::Table)
                    .col(ApprovalRequests::Status)
                    .col(ApprovalRequests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApprovalRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CashierSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReconciliationAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reconciliations::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Reconciliations {
    Table,
    Id,
    ChannelId,
    Kind,
    Status,
    SnapshotAt,
    SessionId,
    CountedBy,
    AdjustmentEntryId,
    ApprovalRequestId,
    DecidedBy,
    DecidedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ReconciliationAccounts {
    Table,
    ReconciliationId,
    AccountId,
    AccountCode,
    DeclaredAmountCents,
    ExpectedAmountCents,
    VarianceCents,
    IsSystemAccount,
}

#[derive(DeriveIden)]
enum CashierSessions {
    Table,
    Id,
    ChannelId,
    TillId,
    OpenedBy,
    OpenedAt,
    ClosedBy,
    ClosedAt,
    Status,
    OpeningReconciliationId,
    ClosingReconciliationId,
}

#[derive(DeriveIden)]
enum ApprovalRequests {
    Table,
    Id,
    RequestType,
    EntityId,
    Metadata,
    Status,
    DecidedBy,
    DecidedAt,
    CreatedAt,
}
