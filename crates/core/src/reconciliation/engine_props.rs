//! Property-based tests for variance arithmetic.
//!
//! - variance == declared - expected for every row
//! - the adjustment entry always balances and passes ledger validation
//! - a hold happens exactly when one non-system |variance| exceeds the threshold

use std::collections::BTreeMap;

use chrono::Utc;
use proptest::prelude::*;
use tally_shared::types::{AccountId, ActorId, ChannelId, Cents, ReconciliationId};

use super::adjustment::AdjustmentBuilder;
use super::engine::ReconciliationEngine;
use super::policy::VariancePolicy;
use super::types::{ReconciliationStatus, ScopedAccount};
use crate::ledger::{AccountCode, AccountInfo, AccountRef, LedgerError, LedgerService};

/// Strategy to generate (expected, declared, is_system) rows.
fn rows() -> impl Strategy<Value = Vec<(i64, i64, bool)>> {
    prop::collection::vec(
        (-10_000_000i64..10_000_000, -10_000_000i64..10_000_000, any::<bool>()),
        1..6,
    )
}

fn build_scope(
    channel: ChannelId,
    rows: &[(i64, i64, bool)],
) -> (Vec<ScopedAccount>, BTreeMap<AccountId, Cents>) {
    let mut scope = Vec::new();
    let mut declared = BTreeMap::new();
    for (i, (expected, decl, system)) in rows.iter().enumerate() {
        let account = AccountInfo {
            id: AccountId::new(),
            channel_id: channel,
            code: AccountCode::parse(&format!("ACC_{i}")).unwrap(),
            name: format!("Account {i}"),
            is_system_account: *system,
        };
        if !*system {
            declared.insert(account.id, Cents::new(*decl));
        }
        scope.push(ScopedAccount {
            account,
            expected: Cents::new(*expected),
        });
    }
    (scope, declared)
}

fn short_over(channel: ChannelId) -> AccountInfo {
    AccountInfo {
        id: AccountId::new(),
        channel_id: channel,
        code: AccountCode::parse("CASH_SHORT_OVER").unwrap(),
        name: "Cash short and over".to_string(),
        is_system_account: true,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* scope, each row's variance SHALL be declared - expected and
    /// system rows SHALL have zero variance.
    #[test]
    fn prop_variance_arithmetic(rows in rows()) {
        let channel = ChannelId::new();
        let (scope, declared) = build_scope(channel, &rows);
        let lines = ReconciliationEngine::compute_lines(&scope, &declared, &short_over(channel))
            .unwrap();

        for line in &lines {
            prop_assert_eq!(line.variance, line.declared - line.expected);
            if line.is_system_account {
                prop_assert!(line.variance.is_zero());
            }
        }
    }

    /// *For any* scope, the adjustment entry SHALL pass ledger validation and
    /// its short/over line SHALL carry -sum(variance).
    #[test]
    fn prop_adjustment_balances(rows in rows()) {
        let channel = ChannelId::new();
        let so = short_over(channel);
        let (scope, declared) = build_scope(channel, &rows);
        let lines = ReconciliationEngine::compute_lines(&scope, &declared, &so).unwrap();

        let entry = AdjustmentBuilder::build(
            channel, ReconciliationId::new(), None, &lines, &so, ActorId::new()).unwrap();
        let Some(entry) = entry else {
            prop_assert!(lines.iter().all(|l| l.variance.is_zero()));
            return Ok(());
        };

        let accounts: Vec<AccountInfo> =
            scope.iter().map(|s| s.account.clone()).chain(std::iter::once(so.clone())).collect();
        let short_over_posted: Cents = entry
            .lines
            .iter()
            .filter(|l| l.account == AccountRef::Id(so.id))
            .map(|l| l.amount)
            .sum();
        prop_assert_eq!(
            short_over_posted,
            AdjustmentBuilder::short_over_amount(&lines).unwrap()
        );

        let validated = LedgerService::validate_entry(entry, Utc::now(), |r| match r {
            AccountRef::Id(id) => accounts
                .iter()
                .find(|a| a.id == *id)
                .cloned()
                .ok_or_else(|| LedgerError::UnknownAccount(id.to_string())),
            AccountRef::Code(code) => Err(LedgerError::UnknownAccount(code.to_string())),
        });
        prop_assert!(validated.is_ok(), "adjustment rejected: {:?}", validated);
    }

    /// *For any* scope and threshold, the reconciliation SHALL be held
    /// exactly when some non-system |variance| > threshold.
    #[test]
    fn prop_hold_iff_threshold_exceeded(rows in rows(), threshold in 0i64..5_000_000) {
        let channel = ChannelId::new();
        let (scope, declared) = build_scope(channel, &rows);
        let lines = ReconciliationEngine::compute_lines(&scope, &declared, &short_over(channel))
            .unwrap();

        let expected_hold = rows
            .iter()
            .any(|(e, d, system)| !system && (d - e).abs() > threshold);
        let (status, approval_required) =
            ReconciliationEngine::status_for(&lines, VariancePolicy::new(Cents::new(threshold)));

        prop_assert_eq!(approval_required, expected_hold);
        prop_assert_eq!(status == ReconciliationStatus::PendingApproval, expected_hold);
    }
}
