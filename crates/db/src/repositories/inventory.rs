//! Inventory repository: batches, movements and sale COGS.
//!
//! Batch decrements are optimistic. Each one is an
//! `UPDATE ... WHERE id = ? AND quantity_remaining = observed`; a miss rolls
//! back the whole transaction and the operation is retried.

use std::future::Future;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tally_core::costing::{
    BatchAllocation, CostingError, CostingService, FifoAllocator, InventoryBatch, MovementType,
    OpenBatch, RecordPurchaseInput, RecordSaleInput, RecordWriteOffInput, SaleCogs, SaleOutcome,
    WriteOffOutcome,
};
use tally_core::ledger::AccountCode;
use tally_shared::types::{
    BatchId, ChannelId, Cents, JournalEntryId, MovementId, Quantity, SaleCogsId,
    StockLocationId, VariantId,
};
use tracing::{info, warn};

use super::account::AccountRepository;
use super::channel_settings::ChannelSettingsRepository;
use super::ledger::LedgerRepository;
use crate::entities::{inventory_batches, inventory_movements, sale_cogs};
use crate::error::{DbFailure, is_unique_violation};

/// Costing behaviour that is not per-channel.
#[derive(Debug, Clone)]
pub struct InventoryOptions {
    /// Retries after a batch conflict before giving up.
    pub max_allocation_retries: u32,
    /// Whether sales and write-offs post journal entries.
    pub post_cogs_entries: bool,
    /// Account debited with COGS.
    pub cogs_account: AccountCode,
    /// Account credited with consumed inventory.
    pub inventory_account: AccountCode,
}

/// Inventory repository for FIFO costing operations.
#[derive(Clone)]
pub struct InventoryRepository {
    db: DatabaseConnection,
    accounts: AccountRepository,
    settings: ChannelSettingsRepository,
    options: InventoryOptions,
}

impl InventoryRepository {
    /// Creates a new inventory repository.
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        accounts: AccountRepository,
        settings: ChannelSettingsRepository,
        options: InventoryOptions,
    ) -> Self {
        Self {
            db,
            accounts,
            settings,
            options,
        }
    }

    /// Records received stock as a new batch.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or a database error.
    pub async fn record_purchase(
        &self,
        input: RecordPurchaseInput,
    ) -> Result<InventoryBatch, CostingError> {
        CostingService::validate_purchase(&input)?;

        let now = Utc::now();
        let batch_id = BatchId::new();
        let txn = self.db.begin().await.map_err(CostingError::from_db)?;

        let model = inventory_batches::ActiveModel {
            id: Set(batch_id.into_inner()),
            channel_id: Set(input.channel_id.into_inner()),
            stock_location_id: Set(input.stock_location_id.into_inner()),
            variant_id: Set(input.variant_id.into_inner()),
            quantity_original: Set(input.quantity.tenths()),
            quantity_remaining: Set(input.quantity.tenths()),
            unit_cost_cents: Set(input.unit_cost.value()),
            expires_at: Set(input.batch.expires_at),
            source: Set(input.batch.source.into()),
            source_id: Set(input.batch.source_id.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(CostingError::from_db)?;

        Self::insert_movement(
            &txn,
            batch_id,
            input.channel_id,
            input.batch.source.creation_movement(),
            input.quantity.tenths(),
            &input.batch.source_id,
        )
        .await?;

        txn.commit().await.map_err(CostingError::from_db)?;

        info!(
            batch_id = %batch_id,
            channel_id = %input.channel_id,
            variant_id = %input.variant_id,
            quantity = %input.quantity,
            unit_cost = %input.unit_cost,
            "Inventory batch recorded"
        );
        Ok(to_batch(model))
    }

    /// Costs a sold order line against open batches, oldest first.
    ///
    /// Retrying the same `(order, line)` returns the stored row with
    /// `replayed = true` and consumes nothing.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` when the channel policy rejects the
    /// shortfall, or `ConcurrentModification` once retries run out.
    pub async fn record_sale(&self, mut input: RecordSaleInput) -> Result<SaleOutcome, CostingError> {
        CostingService::validate_sale(&input)?;
        input.sale_date = Some(input.sale_date.unwrap_or_else(Utc::now));

        let input = &input;
        retry_on_conflict(self.options.max_allocation_retries, move |attempt| {
            if attempt > 0 {
                warn!(
                    order_id = %input.order_id,
                    order_line_id = %input.order_line_id,
                    attempt,
                    "Batch conflict while costing sale, retrying"
                );
            }
            self.try_record_sale(input)
        })
        .await
    }

    async fn try_record_sale(&self, input: &RecordSaleInput) -> Result<SaleOutcome, CostingError> {
        let txn = self.db.begin().await.map_err(CostingError::from_db)?;

        if let Some(existing) = Self::find_sale_in(
            &txn,
            input.channel_id,
            &input.order_id,
            &input.order_line_id,
        )
        .await?
        {
            txn.commit().await.map_err(CostingError::from_db)?;
            info!(
                order_id = %input.order_id,
                order_line_id = %input.order_line_id,
                "Sale already costed, returning stored COGS"
            );
            return Ok(SaleOutcome {
                sale: to_sale(existing),
                replayed: true,
            });
        }

        let policy = self
            .settings
            .get_or_default_in(&txn, input.channel_id)
            .await
            .map_err(CostingError::from_db)?
            .settings
            .oversell_policy;

        let open = Self::open_batches_in(
            &txn,
            input.channel_id,
            input.stock_location_id,
            input.variant_id,
        )
        .await?;
        let plan = FifoAllocator::plan_sale(&open, input.quantity, policy, input.wholesale_price)?;

        let reference = CostingService::sale_source_id(&input.order_id, &input.order_line_id);
        Self::consume(&txn, input.channel_id, &plan.allocations, MovementType::Sale, &reference)
            .await?;

        let journal_entry_id = if self.options.post_cogs_entries && plan.cogs.is_positive() {
            let entry = CostingService::cogs_entry(
                input,
                plan.cogs,
                &self.options.cogs_account,
                &self.options.inventory_account,
            )?;
            Some(LedgerRepository::post_in(&txn, &self.accounts, entry).await?.id)
        } else {
            None
        };

        let sale_date = input.sale_date.unwrap_or_else(Utc::now);
        let row = sale_cogs::ActiveModel {
            id: Set(SaleCogsId::new().into_inner()),
            channel_id: Set(input.channel_id.into_inner()),
            order_id: Set(input.order_id.clone()),
            order_line_id: Set(input.order_line_id.clone()),
            variant_id: Set(input.variant_id.into_inner()),
            stock_location_id: Set(input.stock_location_id.into_inner()),
            sale_date: Set(sale_date),
            quantity: Set(input.quantity.tenths()),
            cogs_cents: Set(plan.cogs.value()),
            source: Set(plan.source.into()),
            estimated_quantity: Set(plan.estimated_quantity.tenths()),
            journal_entry_id: Set(journal_entry_id.map(JournalEntryId::into_inner)),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            // A concurrent request stored this line first; the retry replays it
            if is_unique_violation(&e) {
                CostingError::ConcurrentModification
            } else {
                CostingError::from_db(e)
            }
        })?;

        txn.commit().await.map_err(CostingError::from_db)?;

        let sale = to_sale(row);
        if sale.source.is_estimate() {
            warn!(
                order_id = %sale.order_id,
                order_line_id = %sale.order_line_id,
                estimated_quantity = %sale.estimated_quantity,
                source = sale.source.as_str(),
                "Sale oversold; shortfall costed at wholesale price"
            );
        }
        info!(
            order_id = %sale.order_id,
            order_line_id = %sale.order_line_id,
            cogs = %sale.cogs,
            batches = plan.allocations.len(),
            "Sale costed"
        );

        Ok(SaleOutcome {
            sale,
            replayed: false,
        })
    }

    /// Writes off stock from open batches, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` if the batches cannot cover the quantity.
    pub async fn record_write_off(
        &self,
        input: RecordWriteOffInput,
    ) -> Result<WriteOffOutcome, CostingError> {
        CostingService::validate_write_off(&input)?;

        let input = &input;
        retry_on_conflict(self.options.max_allocation_retries, move |attempt| {
            if attempt > 0 {
                warn!(reason = %input.reason, attempt, "Batch conflict during write-off, retrying");
            }
            self.try_record_write_off(input)
        })
        .await
    }

    async fn try_record_write_off(
        &self,
        input: &RecordWriteOffInput,
    ) -> Result<WriteOffOutcome, CostingError> {
        let txn = self.db.begin().await.map_err(CostingError::from_db)?;

        let open = Self::open_batches_in(
            &txn,
            input.channel_id,
            input.stock_location_id,
            input.variant_id,
        )
        .await?;
        let plan = FifoAllocator::plan_write_off(&open, input.quantity)?;

        Self::consume(
            &txn,
            input.channel_id,
            &plan.allocations,
            MovementType::Adjustment,
            &input.reason,
        )
        .await?;

        let journal_entry_id = if self.options.post_cogs_entries && plan.cogs.is_positive() {
            let entry = CostingService::write_off_entry(
                input,
                plan.cogs,
                &self.options.cogs_account,
                &self.options.inventory_account,
            );
            Some(LedgerRepository::post_in(&txn, &self.accounts, entry).await?.id)
        } else {
            None
        };

        txn.commit().await.map_err(CostingError::from_db)?;

        info!(
            channel_id = %input.channel_id,
            variant_id = %input.variant_id,
            quantity = %input.quantity,
            cost = %plan.cogs,
            "Stock written off"
        );

        Ok(WriteOffOutcome {
            allocations: plan.allocations,
            cost: plan.cogs,
            journal_entry_id,
        })
    }

    /// Gets the COGS row for an order line.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_sale_cogs(
        &self,
        channel_id: ChannelId,
        order_id: &str,
        order_line_id: &str,
    ) -> Result<Option<SaleCogs>, CostingError> {
        let row = Self::find_sale_in(&self.db, channel_id, order_id, order_line_id).await?;
        Ok(row.map(to_sale))
    }

    /// Lists all batches of a variant at a location in FIFO order,
    /// exhausted ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_batches(
        &self,
        channel_id: ChannelId,
        stock_location_id: StockLocationId,
        variant_id: VariantId,
    ) -> Result<Vec<InventoryBatch>, CostingError> {
        let rows = inventory_batches::Entity::find()
            .filter(inventory_batches::Column::ChannelId.eq(channel_id.into_inner()))
            .filter(inventory_batches::Column::StockLocationId.eq(stock_location_id.into_inner()))
            .filter(inventory_batches::Column::VariantId.eq(variant_id.into_inner()))
            .order_by_asc(inventory_batches::Column::CreatedAt)
            .order_by_asc(inventory_batches::Column::Id)
            .all(&self.db)
            .await
            .map_err(CostingError::from_db)?;
        Ok(rows.into_iter().map(to_batch).collect())
    }

    async fn find_sale_in<C: ConnectionTrait>(
        conn: &C,
        channel_id: ChannelId,
        order_id: &str,
        order_line_id: &str,
    ) -> Result<Option<sale_cogs::Model>, CostingError> {
        sale_cogs::Entity::find()
            .filter(sale_cogs::Column::ChannelId.eq(channel_id.into_inner()))
            .filter(sale_cogs::Column::OrderId.eq(order_id))
            .filter(sale_cogs::Column::OrderLineId.eq(order_line_id))
            .one(conn)
            .await
            .map_err(CostingError::from_db)
    }

    async fn open_batches_in<C: ConnectionTrait>(
        conn: &C,
        channel_id: ChannelId,
        stock_location_id: StockLocationId,
        variant_id: VariantId,
    ) -> Result<Vec<OpenBatch>, CostingError> {
        let rows = inventory_batches::Entity::find()
            .filter(inventory_batches::Column::ChannelId.eq(channel_id.into_inner()))
            .filter(inventory_batches::Column::StockLocationId.eq(stock_location_id.into_inner()))
            .filter(inventory_batches::Column::VariantId.eq(variant_id.into_inner()))
            .filter(inventory_batches::Column::QuantityRemaining.gt(0))
            .order_by_asc(inventory_batches::Column::CreatedAt)
            .order_by_asc(inventory_batches::Column::Id)
            .all(conn)
            .await
            .map_err(CostingError::from_db)?;

        Ok(rows
            .into_iter()
            .map(|b| OpenBatch {
                id: BatchId::from_uuid(b.id),
                remaining: Quantity::from_tenths(b.quantity_remaining),
                unit_cost: Cents::new(b.unit_cost_cents),
                created_at: b.created_at,
            })
            .collect())
    }

    /// Decrements each allocated batch and logs a movement for it.
    async fn consume(
        txn: &DatabaseTransaction,
        channel_id: ChannelId,
        allocations: &[BatchAllocation],
        movement_type: MovementType,
        reference: &str,
    ) -> Result<(), CostingError> {
        for allocation in allocations {
            let result = inventory_batches::Entity::update_many()
                .col_expr(
                    inventory_batches::Column::QuantityRemaining,
                    Expr::value(allocation.remaining_after().tenths()),
                )
                .filter(inventory_batches::Column::Id.eq(allocation.batch_id.into_inner()))
                .filter(
                    inventory_batches::Column::QuantityRemaining
                        .eq(allocation.observed_remaining.tenths()),
                )
                .exec(txn)
                .await
                .map_err(CostingError::from_db)?;

            if result.rows_affected != 1 {
                return Err(CostingError::ConcurrentModification);
            }

            Self::insert_movement(
                txn,
                allocation.batch_id,
                channel_id,
                movement_type,
                -allocation.quantity.tenths(),
                reference,
            )
            .await?;
        }
        Ok(())
    }

    async fn insert_movement<C: ConnectionTrait>(
        conn: &C,
        batch_id: BatchId,
        channel_id: ChannelId,
        movement_type: MovementType,
        quantity_tenths: i64,
        reference: &str,
    ) -> Result<(), CostingError> {
        inventory_movements::ActiveModel {
            id: Set(MovementId::new().into_inner()),
            batch_id: Set(batch_id.into_inner()),
            channel_id: Set(channel_id.into_inner()),
            movement_type: Set(movement_type.into()),
            quantity: Set(quantity_tenths),
            reference: Set(reference.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(CostingError::from_db)?;
        Ok(())
    }
}

/// Runs `op` again while it reports a batch conflict, up to `max_retries`
/// extra attempts. `op` receives the zero-based attempt number.
async fn retry_on_conflict<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T, CostingError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CostingError>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Err(CostingError::ConcurrentModification) if attempt < max_retries => attempt += 1,
            result => return result,
        }
    }
}

fn to_batch(model: inventory_batches::Model) -> InventoryBatch {
    InventoryBatch {
        id: BatchId::from_uuid(model.id),
        channel_id: ChannelId::from_uuid(model.channel_id),
        stock_location_id: StockLocationId::from_uuid(model.stock_location_id),
        variant_id: VariantId::from_uuid(model.variant_id),
        quantity_original: Quantity::from_tenths(model.quantity_original),
        quantity_remaining: Quantity::from_tenths(model.quantity_remaining),
        unit_cost: Cents::new(model.unit_cost_cents),
        expires_at: model.expires_at,
        source: model.source.into(),
        source_id: model.source_id,
        created_at: model.created_at,
    }
}

fn to_sale(model: sale_cogs::Model) -> SaleCogs {
    SaleCogs {
        id: SaleCogsId::from_uuid(model.id),
        channel_id: ChannelId::from_uuid(model.channel_id),
        order_id: model.order_id,
        order_line_id: model.order_line_id,
        variant_id: VariantId::from_uuid(model.variant_id),
        stock_location_id: StockLocationId::from_uuid(model.stock_location_id),
        sale_date: model.sale_date,
        quantity: Quantity::from_tenths(model.quantity),
        cogs: Cents::new(model.cogs_cents),
        source: model.source.into(),
        estimated_quantity: Quantity::from_tenths(model.estimated_quantity),
        journal_entry_id: model.journal_entry_id.map(JournalEntryId::from_uuid),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tally_core::channel::ChannelSettings;
    use tally_core::costing::{BatchMeta, BatchSource, OversellPolicy};

    use super::*;
    use crate::migration::{Migrator, MigratorTrait};

    struct Fixture {
        repo: InventoryRepository,
        channel: ChannelId,
        variant: VariantId,
        location: StockLocationId,
    }

    async fn fixture() -> Fixture {
        let db = crate::connect("sqlite::memory:", 1, 1).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let accounts = AccountRepository::new(db.clone());
        let channel = ChannelId::new();
        accounts.seed_defaults(channel).await.unwrap();
        let settings = ChannelSettingsRepository::new(
            db.clone(),
            ChannelSettings::defaults(Cents::new(1_000), OversellPolicy::Reject),
        );
        let repo = InventoryRepository::new(
            db,
            accounts,
            settings,
            InventoryOptions {
                max_allocation_retries: 3,
                post_cogs_entries: true,
                cogs_account: AccountCode::parse("COGS").unwrap(),
                inventory_account: AccountCode::parse("INVENTORY").unwrap(),
            },
        );

        Fixture {
            repo,
            channel,
            variant: VariantId::new(),
            location: StockLocationId::new(),
        }
    }

    impl Fixture {
        async fn receive(&self, units: i64, unit_cost: i64) {
            self.repo
                .record_purchase(RecordPurchaseInput {
                    channel_id: self.channel,
                    variant_id: self.variant,
                    stock_location_id: self.location,
                    quantity: Quantity::units(units),
                    unit_cost: Cents::new(unit_cost),
                    batch: BatchMeta {
                        source: BatchSource::Purchase,
                        source_id: "po-1".to_string(),
                        expires_at: None,
                    },
                })
                .await
                .unwrap();
        }

        fn sale(&self, line: &str, units: i64) -> RecordSaleInput {
            RecordSaleInput {
                channel_id: self.channel,
                variant_id: self.variant,
                stock_location_id: self.location,
                quantity: Quantity::units(units),
                order_id: "order-1".to_string(),
                order_line_id: line.to_string(),
                sale_date: Some(Utc::now()),
                wholesale_price: None,
            }
        }

        async fn open(&self) -> Vec<OpenBatch> {
            InventoryRepository::open_batches_in(
                &self.repo.db,
                self.channel,
                self.location,
                self.variant,
            )
            .await
            .unwrap()
        }

        /// Plans a one-unit sale against the batches as they are now.
        async fn plan_one(&self) -> Vec<BatchAllocation> {
            let open = self.open().await;
            FifoAllocator::plan_sale(&open, Quantity::units(1), OversellPolicy::Reject, None)
                .unwrap()
                .allocations
        }
    }

    #[tokio::test]
    async fn test_stale_batch_observation_is_a_conflict() {
        let f = fixture().await;
        f.receive(2, 100).await;
        let stale = f.plan_one().await;

        f.repo.record_sale(f.sale("line-1", 1)).await.unwrap();

        let txn = f.repo.db.begin().await.unwrap();
        let err = InventoryRepository::consume(&txn, f.channel, &stale, MovementType::Sale, "stale")
            .await
            .unwrap_err();
        assert_eq!(err, CostingError::ConcurrentModification);
        txn.rollback().await.unwrap();

        let remaining: Vec<_> = f.open().await.iter().map(|b| b.remaining).collect();
        assert_eq!(remaining, [Quantity::units(1)]);
    }

    #[tokio::test]
    async fn test_conflict_retry_reallocates_to_next_batch() {
        let f = fixture().await;
        f.receive(1, 100).await;
        f.receive(1, 200).await;
        let stale = f.plan_one().await;
        let calls = AtomicU32::new(0);

        let (f, stale, calls) = (&f, &stale, &calls);
        let input = f.sale("line-2", 1);
        let input = &input;
        let outcome = retry_on_conflict(3, move |attempt| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if attempt == 0 {
                // Another till takes the oldest unit after this one planned
                f.repo.record_sale(f.sale("line-1", 1)).await.unwrap();
                let txn = f.repo.db.begin().await.unwrap();
                let conflict =
                    InventoryRepository::consume(&txn, f.channel, stale, MovementType::Sale, "stale")
                        .await
                        .unwrap_err();
                txn.rollback().await.unwrap();
                return Err(conflict);
            }
            f.repo.try_record_sale(input).await
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.sale.cogs, Cents::new(200));
        assert!(f.open().await.is_empty());
    }

    #[tokio::test]
    async fn test_retries_run_out_with_conflict() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), _> = retry_on_conflict(2, move |_| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CostingError::ConcurrentModification)
        })
        .await;

        assert_eq!(result, Err(CostingError::ConcurrentModification));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), _> = retry_on_conflict(2, move |_| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CostingError::CostOverflow)
        })
        .await;

        assert_eq!(result, Err(CostingError::CostOverflow));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
