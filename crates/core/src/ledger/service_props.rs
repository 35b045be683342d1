//! Property-based tests for LedgerService.
//!
//! - Balance integrity: random signed splits either post balanced or are rejected
//! - Rejection never depends on line order

use chrono::Utc;
use proptest::prelude::*;
use tally_shared::types::{AccountId, ChannelId, Cents};

use super::account::{AccountCode, AccountInfo, AccountRef};
use super::error::LedgerError;
use super::service::LedgerService;
use super::types::{PostEntryInput, PostLineInput, SourceType};

/// Strategy to generate a non-zero line amount (either sign, up to 10,000,000.00).
fn non_zero_amount() -> impl Strategy<Value = i64> {
    prop_oneof![1i64..1_000_000_000i64, -1_000_000_000i64..-1i64]
}

/// Strategy to split a positive total into 1..6 positive parts.
fn split(total: i64) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..=total.max(1), 0..5).prop_map(move |mut cuts| {
        cuts.sort_unstable();
        cuts.dedup();
        let mut parts = Vec::with_capacity(cuts.len() + 1);
        let mut prev = 0;
        for cut in cuts.into_iter().filter(|c| *c < total) {
            parts.push(cut - prev);
            prev = cut;
        }
        parts.push(total - prev);
        parts
    })
}

/// Strategy to generate a balanced set of lines: debits split one way,
/// credits split another.
fn balanced_lines() -> impl Strategy<Value = Vec<i64>> {
    (1i64..10_000_000i64)
        .prop_flat_map(|total| (split(total), split(total)))
        .prop_map(|(debits, credits)| {
            debits
                .into_iter()
                .chain(credits.into_iter().map(|c| -c))
                .collect()
        })
}

fn account(channel: ChannelId) -> AccountInfo {
    AccountInfo {
        id: AccountId::new(),
        channel_id: channel,
        code: AccountCode::parse("CASH").unwrap(),
        name: "Cash".to_string(),
        is_system_account: false,
    }
}

fn make_input(channel: ChannelId, account_id: AccountId, amounts: &[i64]) -> PostEntryInput {
    PostEntryInput {
        channel_id: channel,
        source_type: SourceType::Sale,
        source_id: "prop".to_string(),
        occurred_at: None,
        memo: None,
        posted_by: None,
        lines: amounts
            .iter()
            .map(|a| PostLineInput::new(AccountRef::Id(account_id), Cents::new(*a)))
            .collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* set of lines whose sum is zero, validation SHALL succeed
    /// and the stored lines SHALL still sum to zero.
    #[test]
    fn prop_balanced_split_accepted(amounts in balanced_lines()) {
        let channel = ChannelId::new();
        let info = account(channel);
        let input = make_input(channel, info.id, &amounts);

        let entry = LedgerService::validate_entry(input, Utc::now(), |_| Ok(info.clone()));
        prop_assert!(entry.is_ok(), "balanced split rejected: {:?}", entry);
        let entry = entry.unwrap();
        let sum: Cents = entry.lines.iter().map(|l| l.amount).sum();
        prop_assert_eq!(sum, Cents::ZERO);
        prop_assert_eq!(entry.lines.len(), amounts.len());
    }

    /// *For any* balanced split perturbed by a non-zero delta on one line,
    /// validation SHALL fail with `UnbalancedEntry` carrying the delta.
    #[test]
    fn prop_perturbed_split_rejected(
        amounts in balanced_lines(),
        delta in non_zero_amount(),
        index in any::<prop::sample::Index>(),
    ) {
        let mut amounts = amounts;
        let i = index.index(amounts.len());
        amounts[i] += delta;
        prop_assume!(amounts[i] != 0);

        let channel = ChannelId::new();
        let info = account(channel);
        let input = make_input(channel, info.id, &amounts);

        let result = LedgerService::validate_entry(input, Utc::now(), |_| Ok(info.clone()));
        prop_assert_eq!(result.unwrap_err(), LedgerError::UnbalancedEntry { sum: Cents::new(delta) });
    }

    /// *For any* random set of non-zero lines, validation SHALL accept the
    /// entry exactly when the lines sum to zero.
    #[test]
    fn prop_random_lines_balance_or_reject(
        amounts in prop::collection::vec(non_zero_amount(), 2..8),
    ) {
        let channel = ChannelId::new();
        let info = account(channel);
        let expected_sum: i64 = amounts.iter().sum();
        let input = make_input(channel, info.id, &amounts);

        let result = LedgerService::validate_entry(input, Utc::now(), |_| Ok(info.clone()));
        if expected_sum == 0 {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(
                result.unwrap_err(),
                LedgerError::UnbalancedEntry { sum: Cents::new(expected_sum) }
            );
        }
    }

    /// *For any* balanced split, reversing line order SHALL NOT change the outcome.
    #[test]
    fn prop_line_order_irrelevant(amounts in balanced_lines()) {
        let channel = ChannelId::new();
        let info = account(channel);
        let mut reversed = amounts.clone();
        reversed.reverse();

        let forward = LedgerService::validate_entry(
            make_input(channel, info.id, &amounts), Utc::now(), |_| Ok(info.clone()));
        let backward = LedgerService::validate_entry(
            make_input(channel, info.id, &reversed), Utc::now(), |_| Ok(info.clone()));
        prop_assert_eq!(forward.is_ok(), backward.is_ok());
    }
}
