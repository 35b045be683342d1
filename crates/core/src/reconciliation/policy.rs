//! Variance hold policy.

use tally_shared::types::Cents;

use super::types::ReconciliationLine;

/// Holds a reconciliation when any single non-system account's absolute
/// variance is strictly greater than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariancePolicy {
    threshold: Cents,
}

impl VariancePolicy {
    /// Creates a policy. Negative thresholds are treated as zero.
    #[must_use]
    pub fn new(threshold: Cents) -> Self {
        Self {
            threshold: if threshold.is_negative() { Cents::ZERO } else { threshold },
        }
    }

    /// The effective threshold.
    #[must_use]
    pub const fn threshold(&self) -> Cents {
        self.threshold
    }

    /// Returns true if the variance on one account triggers a hold.
    #[must_use]
    pub fn exceeds(&self, variance: Cents) -> bool {
        variance.abs() > self.threshold
    }

    /// Returns true if any non-system line triggers a hold.
    #[must_use]
    pub fn requires_approval(&self, lines: &[ReconciliationLine]) -> bool {
        lines
            .iter()
            .any(|l| !l.is_system_account && self.exceeds(l.variance))
    }
}
