//! Variance-approval bridge.
//!
//! Outbound: held reconciliations raise an [`ApprovalRequest`] through an
//! [`ApprovalGateway`]. Inbound: an [`ApprovalDecision`] resumes or disputes
//! the deferred adjustment.

pub mod error;
pub mod gateway;
pub mod types;

pub use error::ApprovalError;
pub use gateway::ApprovalGateway;
pub use types::{ApprovalDecision, ApprovalRequest, ApprovalRequestType, ApprovalStatus};
