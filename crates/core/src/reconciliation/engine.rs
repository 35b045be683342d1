//! Snapshot row computation.
//!
//! System accounts are always auto-declared equal to expected. Every other
//! account in scope must carry a declaration.

use std::collections::{BTreeMap, BTreeSet};

use tally_shared::types::{AccountId, Cents};

use super::adjustment::AdjustmentBuilder;
use super::error::ReconciliationError;
use super::policy::VariancePolicy;
use super::types::{ReconciliationLine, ReconciliationStatus, ScopedAccount};
use crate::ledger::{AccountInfo, LedgerError};

/// Stateless reconciliation engine.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Compute declared/expected/variance rows for a snapshot.
    ///
    /// # Arguments
    ///
    /// * `scope` - Accounts with their expected balances; duplicates are ignored
    /// * `declared` - Declared amounts keyed by account
    /// * `short_over` - The variance account, which may not be in scope
    ///
    /// # Errors
    ///
    /// Returns `EmptyScope`, `ShortOverAccountInScope`,
    /// `ManualDeclarationOnSystemAccount`, `MissingDeclaration`,
    /// `DeclarationOutsideScope`, or a nested `AmountOverflow`.
    pub fn compute_lines(
        scope: &[ScopedAccount],
        declared: &BTreeMap<AccountId, Cents>,
        short_over: &AccountInfo,
    ) -> Result<Vec<ReconciliationLine>, ReconciliationError> {
        if scope.is_empty() {
            return Err(ReconciliationError::EmptyScope);
        }

        let mut seen = BTreeSet::new();
        let mut lines = Vec::with_capacity(scope.len());
        for scoped in scope {
            let account = &scoped.account;
            if !seen.insert(account.id) {
                continue;
            }
            if account.id == short_over.id {
                return Err(ReconciliationError::ShortOverAccountInScope(
                    short_over.code.to_string(),
                ));
            }

            let declared_amount = match (account.is_system_account, declared.get(&account.id)) {
                (true, Some(_)) => {
                    return Err(ReconciliationError::ManualDeclarationOnSystemAccount(
                        account.code.to_string(),
                    ));
                }
                (true, None) => scoped.expected,
                (false, Some(amount)) => *amount,
                (false, None) => {
                    return Err(ReconciliationError::MissingDeclaration(
                        account.code.to_string(),
                    ));
                }
            };

            let variance = declared_amount
                .checked_sub(scoped.expected)
                .ok_or(LedgerError::AmountOverflow)?;

            lines.push(ReconciliationLine {
                account_id: account.id,
                account_code: account.code.clone(),
                declared: declared_amount,
                expected: scoped.expected,
                variance,
                is_system_account: account.is_system_account,
            });
        }

        if let Some(outside) = declared.keys().find(|id| !seen.contains(*id)) {
            return Err(ReconciliationError::DeclarationOutsideScope(outside.to_string()));
        }

        // Rows whose variances cannot be netted against short/over are rejected
        // before anything is stored
        AdjustmentBuilder::short_over_amount(&lines)?;

        lines.sort_by(|a, b| a.account_code.cmp(&b.account_code));
        Ok(lines)
    }

    /// Rows for an opening float: expected equals declared, variance zero.
    ///
    /// # Errors
    ///
    /// Returns `ManualDeclarationOnSystemAccount` or `ShortOverAccountInScope`.
    pub fn opening_lines(
        declared: &[(AccountInfo, Cents)],
        short_over: &AccountInfo,
    ) -> Result<Vec<ReconciliationLine>, ReconciliationError> {
        let mut lines = Vec::with_capacity(declared.len());
        for (account, amount) in declared {
            if account.id == short_over.id {
                return Err(ReconciliationError::ShortOverAccountInScope(
                    short_over.code.to_string(),
                ));
            }
            if account.is_system_account {
                return Err(ReconciliationError::ManualDeclarationOnSystemAccount(
                    account.code.to_string(),
                ));
            }
            lines.push(ReconciliationLine {
                account_id: account.id,
                account_code: account.code.clone(),
                declared: *amount,
                expected: *amount,
                variance: Cents::ZERO,
                is_system_account: false,
            });
        }
        lines.sort_by(|a, b| a.account_code.cmp(&b.account_code));
        Ok(lines)
    }

    /// Status after a snapshot under the given policy, and whether approval
    /// must be requested.
    #[must_use]
    pub fn status_for(
        lines: &[ReconciliationLine],
        policy: VariancePolicy,
    ) -> (ReconciliationStatus, bool) {
        if policy.requires_approval(lines) {
            (ReconciliationStatus::PendingApproval, true)
        } else if lines.iter().any(|l| !l.is_system_account && !l.variance.is_zero()) {
            (ReconciliationStatus::Posted, false)
        } else {
            (ReconciliationStatus::Recorded, false)
        }
    }
}
