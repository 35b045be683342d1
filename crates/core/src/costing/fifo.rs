//! First-in-first-out batch allocation and COGS computation.
//!
//! CRITICAL: cost is accumulated exactly in tenth-cents and rounded once, at
//! the total, with banker's rounding. Rounding per batch drifts.

use rust_decimal::Decimal;
use tally_shared::types::{Cents, Quantity};

use super::error::CostingError;
use super::types::{BatchAllocation, CogsSource, CostingPlan, OpenBatch, OversellPolicy};

/// Result of walking the open batches for a requested quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Batches consumed, oldest first.
    pub allocations: Vec<BatchAllocation>,
    /// Quantity the batches could not cover.
    pub shortfall: Quantity,
}

/// Stateless FIFO allocator.
pub struct FifoAllocator;

impl FifoAllocator {
    /// Allocate `requested` against `batches` in creation order.
    ///
    /// Batches are ordered by `created_at`, then by id. Exhausted batches are
    /// skipped. A batch is consumed fully before the next one is touched.
    #[must_use]
    pub fn allocate(batches: &[OpenBatch], requested: Quantity) -> Allocation {
        let mut ordered: Vec<&OpenBatch> =
            batches.iter().filter(|b| b.remaining.is_positive()).collect();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut left = requested;
        let mut allocations = Vec::new();
        for batch in ordered {
            if !left.is_positive() {
                break;
            }
            let take = batch.remaining.min(left);
            allocations.push(BatchAllocation {
                batch_id: batch.id,
                quantity: take,
                unit_cost: batch.unit_cost,
                observed_remaining: batch.remaining,
            });
            left = left - take;
        }

        Allocation {
            allocations,
            shortfall: left,
        }
    }

    /// Total quantity left across open batches.
    #[must_use]
    pub fn available(batches: &[OpenBatch]) -> Quantity {
        batches
            .iter()
            .filter(|b| b.remaining.is_positive())
            .fold(Quantity::ZERO, |acc, b| acc + b.remaining)
    }

    /// Compute total cost of allocations plus an estimated quantity.
    ///
    /// # Errors
    ///
    /// Returns `CostOverflow` if the total leaves the supported range.
    pub fn total_cost(
        allocations: &[BatchAllocation],
        estimated_quantity: Quantity,
        estimate_unit_cost: Cents,
    ) -> Result<Cents, CostingError> {
        let tenth_cents = allocations
            .iter()
            .map(|a| (a.quantity, a.unit_cost))
            .chain(std::iter::once((estimated_quantity, estimate_unit_cost)))
            .try_fold(0i128, |acc, (qty, cost)| {
                i128::from(qty.tenths())
                    .checked_mul(i128::from(cost.value()))
                    .and_then(|v| acc.checked_add(v))
            })
            .ok_or(CostingError::CostOverflow)?;

        let exact = Decimal::try_from_i128_with_scale(tenth_cents, 1)
            .map_err(|_| CostingError::CostOverflow)?;
        Cents::from_decimal_bankers(exact).map_err(|_| CostingError::CostOverflow)
    }

    /// Build the costing plan for a sale under the given oversell policy.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` when batches cannot cover the request and
    /// the policy rejects, or when estimating but no wholesale price is known.
    /// Returns `NegativeUnitCost` for a negative wholesale price.
    pub fn plan_sale(
        batches: &[OpenBatch],
        requested: Quantity,
        policy: OversellPolicy,
        wholesale_price: Option<Cents>,
    ) -> Result<CostingPlan, CostingError> {
        let Allocation {
            allocations,
            shortfall,
        } = Self::allocate(batches, requested);

        if shortfall.is_zero() {
            let cogs = Self::total_cost(&allocations, Quantity::ZERO, Cents::ZERO)?;
            return Ok(CostingPlan {
                allocations,
                estimated_quantity: Quantity::ZERO,
                cogs,
                source: CogsSource::Fifo,
            });
        }

        let insufficient = || CostingError::InsufficientStock {
            requested,
            available: requested - shortfall,
        };

        let price = match (policy, wholesale_price) {
            (OversellPolicy::Reject, _) | (OversellPolicy::WholesaleEstimate, None) => {
                return Err(insufficient());
            }
            (OversellPolicy::WholesaleEstimate, Some(price)) => price,
        };
        if price.is_negative() {
            return Err(CostingError::NegativeUnitCost(price.value()));
        }

        let source = if allocations.is_empty() {
            CogsSource::WholesaleEstimate
        } else {
            CogsSource::FifoWithEstimate
        };
        let cogs = Self::total_cost(&allocations, shortfall, price)?;

        Ok(CostingPlan {
            allocations,
            estimated_quantity: shortfall,
            cogs,
            source,
        })
    }

    /// Build the plan for a write-off, which never estimates.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` if batches cannot cover the quantity.
    pub fn plan_write_off(
        batches: &[OpenBatch],
        requested: Quantity,
    ) -> Result<CostingPlan, CostingError> {
        Self::plan_sale(batches, requested, OversellPolicy::Reject, None)
    }
}
