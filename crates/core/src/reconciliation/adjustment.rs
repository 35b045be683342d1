//! Short/over adjustment entry construction.

use tally_shared::types::{ActorId, ChannelId, Cents, ReconciliationId, SessionId};

use super::error::ReconciliationError;
use super::types::ReconciliationLine;
use crate::ledger::{
    AccountInfo, AccountRef, LedgerError, LedgerService, LineMetadata, MetadataKey,
    PostEntryInput, PostLineInput, SourceType,
};

/// Builds the ledger entry that brings accounts in line with a count.
pub struct AdjustmentBuilder;

impl AdjustmentBuilder {
    /// Build the adjustment for a reconciliation.
    ///
    /// One line per non-system account with a non-zero variance at
    /// `+variance`, and one short/over line at `-sum(variance)` when the sum is
    /// non-zero. Returns `None` when there is nothing to post.
    ///
    /// # Errors
    ///
    /// Returns nested `AmountOverflow` if the variances cannot be summed.
    pub fn build(
        channel_id: ChannelId,
        reconciliation_id: ReconciliationId,
        session_id: Option<SessionId>,
        lines: &[ReconciliationLine],
        short_over: &AccountInfo,
        posted_by: ActorId,
    ) -> Result<Option<PostEntryInput>, ReconciliationError> {
        let tags = LineMetadata::new()
            .with(MetadataKey::ReconciliationId, reconciliation_id.to_string());

        let mut post_lines: Vec<PostLineInput> = lines
            .iter()
            .filter(|l| !l.is_system_account && !l.variance.is_zero())
            .map(|l| {
                PostLineInput::new(AccountRef::Id(l.account_id), l.variance)
                    .with_metadata(tags.clone())
            })
            .collect();
        if post_lines.is_empty() {
            return Ok(None);
        }

        let total = LedgerService::checked_line_sum(post_lines.iter().map(|l| l.amount))?;
        if !total.is_zero() {
            let offset = total.checked_neg().ok_or(LedgerError::AmountOverflow)?;
            post_lines.push(
                PostLineInput::new(AccountRef::Id(short_over.id), offset).with_metadata(tags),
            );
        }

        Ok(Some(PostEntryInput {
            channel_id,
            source_type: SourceType::Reconciliation,
            source_id: Self::source_id(reconciliation_id, session_id),
            occurred_at: None,
            memo: Some(format!("short/over adjustment for {reconciliation_id}")),
            posted_by: Some(posted_by),
            lines: post_lines,
        }))
    }

    /// `{session-or-reconciliation}-{reconciliation}`.
    #[must_use]
    pub fn source_id(reconciliation_id: ReconciliationId, session_id: Option<SessionId>) -> String {
        match session_id {
            Some(session) => format!("{session}-{reconciliation_id}"),
            None => format!("{reconciliation_id}-{reconciliation_id}"),
        }
    }

    /// Net amount the short/over account receives.
    ///
    /// # Errors
    ///
    /// Returns nested `AmountOverflow` if the variances cannot be summed.
    pub fn short_over_amount(lines: &[ReconciliationLine]) -> Result<Cents, ReconciliationError> {
        let total = LedgerService::checked_line_sum(
            lines
                .iter()
                .filter(|l| !l.is_system_account)
                .map(|l| l.variance),
        )?;
        Ok(total.checked_neg().ok_or(LedgerError::AmountOverflow)?)
    }
}
