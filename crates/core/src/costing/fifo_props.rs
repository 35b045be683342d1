//! Property-based tests for the FIFO allocator.
//!
//! - Allocation never exceeds what a batch holds or what was requested
//! - The oldest non-exhausted batch is always consumed first
//! - COGS is rounded once at the total

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{BatchId, Cents, Quantity};

use super::fifo::FifoAllocator;
use super::types::{OpenBatch, OversellPolicy};

/// Strategy to generate open batches with shuffled creation times.
fn batches() -> impl Strategy<Value = Vec<OpenBatch>> {
    prop::collection::vec((0i64..500, 0i64..200, 0i64..100_000), 0..8).prop_map(|rows| {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        rows.into_iter()
            .map(|(minute, tenths, cost)| OpenBatch {
                id: BatchId::new(),
                remaining: Quantity::from_tenths(tenths),
                unit_cost: Cents::new(cost),
                created_at: base + Duration::minutes(minute),
            })
            .collect()
    })
}

/// Strategy to generate a positive requested quantity (0.1 to 150.0).
fn requested() -> impl Strategy<Value = Quantity> {
    (1i64..1_500).prop_map(Quantity::from_tenths)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* batches and request, no batch SHALL be allocated more than
    /// it holds and the total SHALL equal min(requested, available).
    #[test]
    fn prop_never_over_allocates(batches in batches(), requested in requested()) {
        let allocation = FifoAllocator::allocate(&batches, requested);
        let available = FifoAllocator::available(&batches);

        let mut total = Quantity::ZERO;
        for a in &allocation.allocations {
            let batch = batches.iter().find(|b| b.id == a.batch_id).unwrap();
            prop_assert!(a.quantity.is_positive());
            prop_assert!(a.quantity <= batch.remaining);
            prop_assert!(!a.remaining_after().tenths().is_negative());
            total = total + a.quantity;
        }
        prop_assert_eq!(total, requested.min(available));
        prop_assert_eq!(total + allocation.shortfall, requested);
    }

    /// *For any* batches and request, every batch older than the last one
    /// touched SHALL be fully consumed, and allocations SHALL be in
    /// creation order.
    #[test]
    fn prop_oldest_first(batches in batches(), requested in requested()) {
        let allocation = FifoAllocator::allocate(&batches, requested);
        let key = |id: BatchId| {
            let b = batches.iter().find(|b| b.id == id).unwrap();
            (b.created_at, b.id)
        };

        let keys: Vec<_> = allocation.allocations.iter().map(|a| key(a.batch_id)).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));

        if let Some(last) = keys.last() {
            for b in batches.iter().filter(|b| b.remaining.is_positive()) {
                if (b.created_at, b.id) < *last {
                    let taken = allocation
                        .allocations
                        .iter()
                        .find(|a| a.batch_id == b.id)
                        .map_or(Quantity::ZERO, |a| a.quantity);
                    prop_assert_eq!(taken, b.remaining, "older batch not exhausted");
                }
            }
        }
    }

    /// *For any* fully covered sale, COGS SHALL equal the exact sum of
    /// quantity x cost rounded half-to-even once.
    #[test]
    fn prop_cogs_rounded_once(batches in batches(), requested in requested()) {
        prop_assume!(FifoAllocator::available(&batches) >= requested);
        let plan = FifoAllocator::plan_sale(&batches, requested, OversellPolicy::Reject, None)
            .unwrap();

        let exact: Decimal = plan
            .allocations
            .iter()
            .map(|a| a.quantity.to_decimal() * a.unit_cost.to_decimal())
            .sum();
        let expected = Cents::from_decimal_bankers(exact).unwrap();
        prop_assert_eq!(plan.cogs, expected);
    }

    /// *For any* shortfall under the estimate policy, the estimated quantity
    /// SHALL equal the uncovered quantity and the cost SHALL be positive.
    #[test]
    fn prop_estimate_covers_exact_shortfall(
        batches in batches(),
        requested in requested(),
        price in 10i64..10_000,
    ) {
        let available = FifoAllocator::available(&batches);
        prop_assume!(available < requested);
        let plan = FifoAllocator::plan_sale(
            &batches,
            requested,
            OversellPolicy::WholesaleEstimate,
            Some(Cents::new(price)),
        )
        .unwrap();

        prop_assert_eq!(plan.estimated_quantity, requested - available);
        prop_assert!(plan.source.is_estimate());
        prop_assert!(plan.cogs.is_positive());
    }
}
