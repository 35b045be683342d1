//! Outbound seam to the external approval workflow.

use async_trait::async_trait;
use tally_shared::types::ApprovalRequestId;

use super::error::ApprovalError;
use super::types::ApprovalRequest;

/// Sends approval requests to whatever system decides them.
///
/// Implementations are called after the held reconciliation has committed.
/// A failure leaves the reconciliation pending without a request reference.
#[async_trait]
pub trait ApprovalGateway: Send + Sync {
    /// Raise an approval request and return its reference.
    async fn request_approval(
        &self,
        request: ApprovalRequest,
    ) -> Result<ApprovalRequestId, ApprovalError>;
}
