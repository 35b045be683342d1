//! Integration tests for FIFO costing through the inventory repository.

mod common;

use chrono::Utc;
use futures::future::join_all;
use tally_core::channel::ChannelSettings;
use tally_core::costing::{
    BatchMeta, BatchSource, CogsSource, CostingError, OversellPolicy, RecordPurchaseInput,
    RecordSaleInput, RecordWriteOffInput,
};
use tally_core::ledger::MetadataKey;
use tally_shared::types::{Cents, Quantity, StockLocationId, VariantId};

use common::{TestContext, setup};

struct Shelf {
    variant: VariantId,
    location: StockLocationId,
}

impl Shelf {
    fn new() -> Self {
        Self {
            variant: VariantId::new(),
            location: StockLocationId::new(),
        }
    }

    async fn receive(&self, ctx: &TestContext, tenths: i64, unit_cost: i64) {
        ctx.inventory
            .record_purchase(RecordPurchaseInput {
                channel_id: ctx.channel,
                variant_id: self.variant,
                stock_location_id: self.location,
                quantity: Quantity::from_tenths(tenths),
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

    fn sale(&self, ctx: &TestContext, line: &str, tenths: i64) -> RecordSaleInput {
        RecordSaleInput {
            channel_id: ctx.channel,
            variant_id: self.variant,
            stock_location_id: self.location,
            quantity: Quantity::from_tenths(tenths),
            order_id: "order-1".to_string(),
            order_line_id: line.to_string(),
            sale_date: None,
            wholesale_price: None,
        }
    }

    async fn remaining(&self, ctx: &TestContext) -> Vec<i64> {
        ctx.inventory
            .list_batches(ctx.channel, self.location, self.variant)
            .await
            .unwrap()
            .iter()
            .map(|b| b.quantity_remaining.tenths())
            .collect()
    }
}

async fn use_policy(ctx: &TestContext, policy: OversellPolicy) {
    ctx.settings
        .upsert(
            ctx.channel,
            ChannelSettings {
                variance_notification_threshold: Cents::new(1_000),
                oversell_policy: policy,
            },
        )
        .await
        .unwrap();
}

// ============================================================================
// FIFO allocation
// ============================================================================

#[tokio::test]
async fn test_sale_consumes_oldest_batch_first() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 10, 100).await;
    shelf.receive(&ctx, 10, 200).await;

    let outcome = ctx.inventory.record_sale(shelf.sale(&ctx, "line-1", 15)).await.unwrap();

    assert!(!outcome.replayed);
    assert_eq!(outcome.sale.cogs, Cents::new(200));
    assert_eq!(outcome.sale.source, CogsSource::Fifo);
    assert_eq!(outcome.sale.estimated_quantity, Quantity::ZERO);
    assert_eq!(shelf.remaining(&ctx).await, [0, 5]);
}

#[tokio::test]
async fn test_sale_posts_cogs_entry() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 20, 350).await;

    let outcome = ctx.inventory.record_sale(shelf.sale(&ctx, "line-1", 20)).await.unwrap();

    let entry_id = outcome.sale.journal_entry_id.unwrap();
    let entry = ctx.ledger.get_entry(entry_id).await.unwrap();
    assert_eq!(entry.source_id, "order-1-line-1");
    assert!(
        entry
            .lines
            .iter()
            .all(|l| l.metadata.get(MetadataKey::OrderLineId) == Some("line-1"))
    );
    assert_eq!(ctx.balance("COGS").await, Cents::new(700));
    assert_eq!(ctx.balance("INVENTORY").await, Cents::new(-700));
}

#[tokio::test]
async fn test_replayed_sale_consumes_nothing() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 30, 100).await;

    let first = ctx.inventory.record_sale(shelf.sale(&ctx, "line-1", 10)).await.unwrap();
    let second = ctx.inventory.record_sale(shelf.sale(&ctx, "line-1", 10)).await.unwrap();

    assert!(second.replayed);
    assert_eq!(second.sale.id, first.sale.id);
    assert_eq!(shelf.remaining(&ctx).await, [20]);
    assert_eq!(ctx.balance("COGS").await, Cents::new(100));

    let stored = ctx
        .inventory
        .get_sale_cogs(ctx.channel, "order-1", "line-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.cogs, Cents::new(100));
}

#[tokio::test]
async fn test_concurrent_sales_never_drive_stock_negative() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 20, 100).await;
    use_policy(&ctx, OversellPolicy::Reject).await;

    let sales = ["line-1", "line-2", "line-3"]
        .into_iter()
        .map(|line| ctx.inventory.record_sale(shelf.sale(&ctx, line, 10)));
    let results = join_all(sales).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(CostingError::InsufficientStock { .. })))
        .count();
    assert_eq!(succeeded, 2);
    assert_eq!(rejected, 1);
    assert_eq!(shelf.remaining(&ctx).await, [0]);
}

// ============================================================================
// Oversell policy
// ============================================================================

#[tokio::test]
async fn test_reject_policy_fails_short_sale() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 10, 100).await;
    use_policy(&ctx, OversellPolicy::Reject).await;

    let mut sale = shelf.sale(&ctx, "line-1", 15);
    sale.wholesale_price = Some(Cents::new(150));
    let err = ctx.inventory.record_sale(sale).await.unwrap_err();

    assert_eq!(
        err,
        CostingError::InsufficientStock {
            requested: Quantity::from_tenths(15),
            available: Quantity::units(1),
        }
    );
    assert_eq!(shelf.remaining(&ctx).await, [10]);
}

#[tokio::test]
async fn test_estimate_policy_costs_shortfall_at_wholesale() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 10, 100).await;

    let mut sale = shelf.sale(&ctx, "line-1", 30);
    sale.wholesale_price = Some(Cents::new(150));
    let outcome = ctx.inventory.record_sale(sale).await.unwrap();

    assert_eq!(outcome.sale.cogs, Cents::new(400));
    assert_eq!(outcome.sale.source, CogsSource::FifoWithEstimate);
    assert_eq!(outcome.sale.estimated_quantity, Quantity::units(2));
    assert_eq!(shelf.remaining(&ctx).await, [0]);
}

#[tokio::test]
async fn test_estimate_with_no_stock_at_all() {
    let ctx = setup().await;
    let shelf = Shelf::new();

    let mut sale = shelf.sale(&ctx, "line-1", 10);
    sale.wholesale_price = Some(Cents::new(275));
    sale.sale_date = Some(Utc::now());
    let outcome = ctx.inventory.record_sale(sale).await.unwrap();

    assert_eq!(outcome.sale.cogs, Cents::new(275));
    assert_eq!(outcome.sale.source, CogsSource::WholesaleEstimate);
}

#[tokio::test]
async fn test_estimate_without_price_is_insufficient_stock() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 5, 100).await;

    let err = ctx
        .inventory
        .record_sale(shelf.sale(&ctx, "line-1", 10))
        .await
        .unwrap_err();

    assert!(matches!(err, CostingError::InsufficientStock { .. }));
    assert_eq!(shelf.remaining(&ctx).await, [5]);
}

// ============================================================================
// Validation and write-offs
// ============================================================================

#[tokio::test]
async fn test_zero_quantity_sale_is_rejected() {
    let ctx = setup().await;
    let shelf = Shelf::new();

    let err = ctx
        .inventory
        .record_sale(shelf.sale(&ctx, "line-1", 0))
        .await
        .unwrap_err();

    assert_eq!(err, CostingError::NonPositiveQuantity(Quantity::ZERO));
}

#[tokio::test]
async fn test_write_off_decrements_fifo_and_posts_adjustment() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 10, 100).await;
    shelf.receive(&ctx, 50, 200).await;

    let outcome = ctx
        .inventory
        .record_write_off(RecordWriteOffInput {
            channel_id: ctx.channel,
            variant_id: shelf.variant,
            stock_location_id: shelf.location,
            quantity: Quantity::units(2),
            reason: "damaged-in-transit".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.cost, Cents::new(300));
    assert_eq!(outcome.allocations.len(), 2);
    assert!(outcome.journal_entry_id.is_some());
    assert_eq!(shelf.remaining(&ctx).await, [0, 40]);
    assert_eq!(ctx.balance("INVENTORY").await, Cents::new(-300));
}

#[tokio::test]
async fn test_write_off_beyond_stock_fails() {
    let ctx = setup().await;
    let shelf = Shelf::new();
    shelf.receive(&ctx, 10, 100).await;

    let err = ctx
        .inventory
        .record_write_off(RecordWriteOffInput {
            channel_id: ctx.channel,
            variant_id: shelf.variant,
            stock_location_id: shelf.location,
            quantity: Quantity::units(3),
            reason: "stocktake".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CostingError::InsufficientStock { .. }));
    assert_eq!(shelf.remaining(&ctx).await, [10]);
}
