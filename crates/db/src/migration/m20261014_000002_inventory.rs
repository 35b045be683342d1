//! Inventory costing migration.
//!
//! Creates FIFO batches, the append-only movement log and per-order-line
//! COGS rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryBatches::Table)
                    .col(
                        ColumnDef::new(InventoryBatches::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InventoryBatches::ChannelId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryBatches::StockLocationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryBatches::VariantId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryBatches::QuantityOriginal)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::QuantityRemaining)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::UnitCostCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryBatches::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(InventoryBatches::Source)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::SourceId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(InventoryBatches::QuantityRemaining).gte(0))
                    .check(
                        Expr::col(InventoryBatches::QuantityRemaining)
                            .lte(Expr::col(InventoryBatches::QuantityOriginal)),
                    )
                    .check(Expr::col(InventoryBatches::UnitCostCents).gte(0))
                    .to_owned(),
            )
            .await?;

        // FIFO scan order within (channel, location, variant)
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_batches_fifo")
                    .table(InventoryBatches::Table)
                    .col(InventoryBatches::ChannelId)
                    .col(InventoryBatches::StockLocationId)
                    .col(InventoryBatches::VariantId)
                    .col(InventoryBatches::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryMovements::Table)
                    .col(
                        ColumnDef::new(InventoryMovements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InventoryMovements::BatchId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryMovements::ChannelId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::MovementType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::Reference)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_movements_batch")
                            .from(InventoryMovements::Table, InventoryMovements::BatchId)
                            .to(InventoryBatches::Table, InventoryBatches::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_movements_batch")
                    .table(InventoryMovements::Table)
                    .col(InventoryMovements::BatchId)
                    .col(InventoryMovements::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleCogs::Table)
                    .col(ColumnDef::new(SaleCogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SaleCogs::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(SaleCogs::OrderId).string_len(60).not_null())
                    .col(
                        ColumnDef::new(SaleCogs::OrderLineId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaleCogs::VariantId).uuid().not_null())
                    .col(ColumnDef::new(SaleCogs::StockLocationId).uuid().not_null())
                    .col(
                        ColumnDef::new(SaleCogs::SaleDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaleCogs::Quantity).big_integer().not_null())
                    .col(ColumnDef::new(SaleCogs::CogsCents).big_integer().not_null())
                    .col(ColumnDef::new(SaleCogs::Source).string_len(32).not_null())
                    .col(
                        ColumnDef::new(SaleCogs::EstimatedQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaleCogs::JournalEntryId).uuid())
                    .col(
                        ColumnDef::new(SaleCogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One COGS row per order line; concurrent duplicates fail here
        manager
            .create_index(
                Index::create()
                    .name("idx_sale_cogs_order_line")
                    .table(SaleCogs::Table)
                    .col(SaleCogs::ChannelId)
                    .col(SaleCogs::OrderId)
                    .col(SaleCogs::OrderLineId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SaleCogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryBatches::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum InventoryBatches {
    Table,
    Id,
    ChannelId,
    StockLocationId,
    VariantId,
    QuantityOriginal,
    QuantityRemaining,
    UnitCostCents,
    ExpiresAt,
    Source,
    SourceId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InventoryMovements {
    Table,
    Id,
    BatchId,
    ChannelId,
    MovementType,
    Quantity,
    Reference,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SaleCogs {
    Table,
    Id,
    ChannelId,
    OrderId,
    OrderLineId,
    VariantId,
    StockLocationId,
    SaleDate,
    Quantity,
    CogsCents,
    Source,
    EstimatedQuantity,
    JournalEntryId,
    CreatedAt,
}
