//! Cashier session state machine.

use std::collections::{BTreeMap, BTreeSet};

use tally_shared::types::{AccountId, Cents, SessionId};

use super::error::SessionError;
use super::types::{MAX_TILL_ID_LEN, SessionStatus};
use crate::ledger::{AccountInfo, LedgerError};
use crate::reconciliation::{ReconciliationLine, ReconciliationStatus, ScopedAccount};

/// Stateless validator for session transitions.
pub struct SessionStateMachine;

impl SessionStateMachine {
    /// Validate a till id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTillId` if the id is blank or longer than 64 characters.
    pub fn validate_till_id(till_id: &str) -> Result<(), SessionError> {
        let trimmed = till_id.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_TILL_ID_LEN {
            return Err(SessionError::InvalidTillId);
        }
        Ok(())
    }

    /// Check that a close may start from the current state.
    ///
    /// A session in `Closing` may be closed again only when its latest
    /// closing reconciliation was disputed.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` for closed sessions and `SessionNotOpen` for a
    /// session still awaiting a decision.
    pub fn check_close(
        session_id: SessionId,
        status: SessionStatus,
        closing_status: Option<ReconciliationStatus>,
    ) -> Result<(), SessionError> {
        match (status, closing_status) {
            (SessionStatus::Open, _)
            | (SessionStatus::Closing, Some(ReconciliationStatus::Disputed)) => Ok(()),
            (SessionStatus::Closing, _) => Err(SessionError::SessionNotOpen(session_id)),
            (SessionStatus::Closed, _) => Err(SessionError::AlreadyClosed(session_id)),
        }
    }

    /// Status after a close snapshot.
    #[must_use]
    pub const fn status_after_close(approval_required: bool) -> SessionStatus {
        if approval_required {
            SessionStatus::Closing
        } else {
            SessionStatus::Closed
        }
    }

    /// Status after a decision on the session's closing reconciliation.
    ///
    /// Rejection keeps the session in `Closing` until a re-count.
    #[must_use]
    pub const fn status_after_decision(approved: bool) -> SessionStatus {
        if approved {
            SessionStatus::Closed
        } else {
            SessionStatus::Closing
        }
    }

    /// Accounts a closing snapshot covers.
    ///
    /// The union of the opening rows, the closing declarations and the
    /// channel's system accounts, excluding the short/over account.
    #[must_use]
    pub fn closing_scope(
        opening: &[AccountInfo],
        declared: &[AccountInfo],
        system: &[AccountInfo],
        short_over: AccountId,
    ) -> Vec<AccountInfo> {
        let mut seen = BTreeSet::new();
        opening
            .iter()
            .chain(declared)
            .chain(system)
            .filter(|a| a.id != short_over && seen.insert(a.id))
            .cloned()
            .collect()
    }

    /// Pair scope accounts with `opening float + session activity`.
    ///
    /// # Errors
    ///
    /// Returns nested `AmountOverflow` if a balance overflows.
    pub fn expected_balances(
        scope: Vec<AccountInfo>,
        opening: &[ReconciliationLine],
        activity: &BTreeMap<AccountId, Cents>,
    ) -> Result<Vec<ScopedAccount>, SessionError> {
        scope
            .into_iter()
            .map(|account| {
                let float = opening
                    .iter()
                    .find(|l| l.account_id == account.id)
                    .map_or(Cents::ZERO, |l| l.declared);
                let moved = activity.get(&account.id).copied().unwrap_or(Cents::ZERO);
                let expected = float.checked_add(moved).ok_or(LedgerError::AmountOverflow)?;
                Ok(ScopedAccount { account, expected })
            })
            .collect()
    }
}
