//! Ledger service for journal entry validation.
//!
//! This module provides the posting rules applied before an entry is
//! persisted. Account lookup is injected so the rules stay free of storage.

use chrono::{DateTime, Utc};
use tally_shared::types::{Cents, ChannelId};

use super::account::{AccountInfo, AccountRef};
use super::error::LedgerError;
use super::metadata::{LineMetadata, MetadataKey};
use super::types::{
    MAX_SOURCE_ID_LEN, PostEntryInput, PostLineInput, ResolvedLine, SourceType, TransferInput,
    ValidatedEntry,
};

/// Ledger service for journal entry validation.
///
/// This service contains pure business logic with no database dependencies.
pub struct LedgerService;

impl LedgerService {
    /// Validate an entry and resolve its accounts before persisting.
    ///
    /// Checks, in order:
    /// 1. Source id is 1-128 characters
    /// 2. At least two lines
    /// 3. Every line is non-zero
    /// 4. Every account exists and belongs to the entry's channel
    /// 5. The checked sum of all lines is exactly zero
    ///
    /// # Arguments
    ///
    /// * `input` - The entry to validate
    /// * `now` - Used when the input has no `occurred_at`
    /// * `account_resolver` - Looks up an account by id or code
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if any rule fails.
    pub fn validate_entry<A>(
        input: PostEntryInput,
        now: DateTime<Utc>,
        account_resolver: A,
    ) -> Result<ValidatedEntry, LedgerError>
    where
        A: Fn(&AccountRef) -> Result<AccountInfo, LedgerError>,
    {
        Self::validate_source_id(&input.source_id)?;

        if input.lines.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }

        let mut resolved = Vec::with_capacity(input.lines.len());
        for (position, line) in input.lines.into_iter().enumerate() {
            if line.amount.is_zero() {
                return Err(LedgerError::ZeroAmount { position });
            }

            let account = account_resolver(&line.account)?;
            Self::check_channel(&account, input.channel_id)?;

            resolved.push(ResolvedLine {
                account_id: account.id,
                account_code: account.code,
                amount: line.amount,
                position: u32::try_from(position).map_err(|_| LedgerError::AmountOverflow)?,
                metadata: line.metadata,
            });
        }

        let sum = Self::checked_line_sum(resolved.iter().map(|l| l.amount))?;
        if !sum.is_zero() {
            return Err(LedgerError::UnbalancedEntry { sum });
        }

        Ok(ValidatedEntry {
            channel_id: input.channel_id,
            source_type: input.source_type,
            source_id: input.source_id,
            occurred_at: input.occurred_at.unwrap_or(now),
            memo: input.memo,
            posted_by: input.posted_by,
            lines: resolved,
        })
    }

    /// Validate a source id length (1-128 characters).
    ///
    /// # Errors
    ///
    /// Returns `InvalidSourceId` with the offending length.
    pub fn validate_source_id(source_id: &str) -> Result<(), LedgerError> {
        let len = source_id.chars().count();
        if len == 0 || len > MAX_SOURCE_ID_LEN {
            return Err(LedgerError::InvalidSourceId(len));
        }
        Ok(())
    }

    /// Sum signed line amounts, failing on overflow instead of wrapping.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if an intermediate sum leaves `i64`.
    pub fn checked_line_sum<I>(amounts: I) -> Result<Cents, LedgerError>
    where
        I: IntoIterator<Item = Cents>,
    {
        Cents::checked_sum(amounts).map_err(|_| LedgerError::AmountOverflow)
    }

    fn check_channel(account: &AccountInfo, channel_id: ChannelId) -> Result<(), LedgerError> {
        if account.channel_id == channel_id {
            Ok(())
        } else {
            Err(LedgerError::ChannelMismatch {
                account_id: account.id,
                account_channel: account.channel_id,
                entry_channel: channel_id,
            })
        }
    }

    /// Build the two-line entry for an inter-account transfer.
    ///
    /// Both lines carry the `transferId` tag.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveTransfer` unless the amount is positive, and
    /// `InvalidMetadata` if `transfer_id` is not a valid tag value.
    pub fn transfer_entry(
        input: TransferInput,
        transfer_id: &str,
    ) -> Result<PostEntryInput, LedgerError> {
        if !input.amount.is_positive() {
            return Err(LedgerError::NonPositiveTransfer(input.amount));
        }
        let credit = -input.amount;
        let tags = LineMetadata::from_versioned(
            LineMetadata::CURRENT_VERSION,
            [(MetadataKey::TransferId.as_str(), transfer_id)],
        )?;

        Ok(PostEntryInput {
            channel_id: input.channel_id,
            source_type: SourceType::InterAccountTransfer,
            source_id: transfer_id.to_string(),
            occurred_at: None,
            memo: input.memo,
            posted_by: input.posted_by,
            lines: vec![
                PostLineInput::new(input.to, input.amount).with_metadata(tags.clone()),
                PostLineInput::new(input.from, credit).with_metadata(tags),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::AccountCode;
    use std::collections::HashMap;
    use tally_shared::types::AccountId;

    struct Chart {
        channel: ChannelId,
        accounts: HashMap<String, AccountInfo>,
    }

    impl Chart {
        fn new(codes: &[&str]) -> Self {
            let channel = ChannelId::new();
            let accounts = codes
                .iter()
                .map(|c| {
                    (
                        (*c).to_string(),
                        AccountInfo {
                            id: AccountId::new(),
                            channel_id: channel,
                            code: AccountCode::parse(c).unwrap(),
                            name: (*c).to_string(),
                            is_system_account: c.starts_with("CLEARING"),
                        },
                    )
                })
                .collect();
            Self { channel, accounts }
        }

        fn resolve(&self, account: &AccountRef) -> Result<AccountInfo, LedgerError> {
            match account {
                AccountRef::Code(code) => self
                    .accounts
                    .get(code.as_str())
                    .cloned()
                    .ok_or_else(|| LedgerError::UnknownAccount(code.to_string())),
                AccountRef::Id(id) => self
                    .accounts
                    .values()
                    .find(|a| a.id == *id)
                    .cloned()
                    .ok_or_else(|| LedgerError::UnknownAccount(id.to_string())),
            }
        }

        fn code(code: &str) -> AccountRef {
            AccountRef::Code(AccountCode::parse(code).unwrap())
        }

        fn entry(&self, lines: &[(&str, i64)]) -> PostEntryInput {
            PostEntryInput {
                channel_id: self.channel,
                source_type: SourceType::Sale,
                source_id: "order-1".to_string(),
                occurred_at: None,
                memo: None,
                posted_by: None,
                lines: lines
                    .iter()
                    .map(|(code, amount)| PostLineInput::new(Self::code(code), Cents::new(*amount)))
                    .collect(),
            }
        }
    }

    #[test]
    fn test_balanced_entry_is_accepted() {
        let chart = Chart::new(&["CASH", "CLEARING_MPESA"]);
        let now = Utc::now();
        let entry = LedgerService::validate_entry(
            chart.entry(&[("CASH", -9700), ("CLEARING_MPESA", 9700)]),
            now,
            |a| chart.resolve(a),
        )
        .unwrap();

        assert_eq!(entry.lines.len(), 2);
        assert_eq!(entry.occurred_at, now);
        assert_eq!(entry.lines[1].position, 1);
        assert_eq!(entry.lines[0].account_code.as_str(), "CASH");
    }

    #[test]
    fn test_unbalanced_entry_reports_sum() {
        let chart = Chart::new(&["CASH", "CLEARING_MPESA"]);
        let result = LedgerService::validate_entry(
            chart.entry(&[("CASH", -100), ("CLEARING_MPESA", 99)]),
            Utc::now(),
            |a| chart.resolve(a),
        );
        assert_eq!(
            result.unwrap_err(),
            LedgerError::UnbalancedEntry { sum: Cents::new(-1) }
        );
    }

    #[test]
    fn test_single_line_rejected() {
        let chart = Chart::new(&["CASH"]);
        let result =
            LedgerService::validate_entry(chart.entry(&[("CASH", 0)]), Utc::now(), |a| {
                chart.resolve(a)
            });
        assert_eq!(result.unwrap_err(), LedgerError::InsufficientLines);
    }

    #[test]
    fn test_zero_line_rejected() {
        let chart = Chart::new(&["CASH", "SALES"]);
        let result = LedgerService::validate_entry(
            chart.entry(&[("CASH", 100), ("SALES", -100), ("SALES", 0)]),
            Utc::now(),
            |a| chart.resolve(a),
        );
        assert_eq!(result.unwrap_err(), LedgerError::ZeroAmount { position: 2 });
    }

    #[test]
    fn test_unknown_account_rejected() {
        let chart = Chart::new(&["CASH"]);
        let result = LedgerService::validate_entry(
            chart.entry(&[("CASH", 100), ("BANK", -100)]),
            Utc::now(),
            |a| chart.resolve(a),
        );
        assert_eq!(result.unwrap_err(), LedgerError::UnknownAccount("BANK".into()));
    }

    #[test]
    fn test_foreign_channel_account_rejected() {
        let chart = Chart::new(&["CASH", "BANK"]);
        let other = Chart::new(&["BANK"]);
        let foreign_bank = other.accounts["BANK"].clone();
        let mut input = chart.entry(&[("CASH", 100)]);
        input
            .lines
            .push(PostLineInput::new(AccountRef::Id(foreign_bank.id), Cents::new(-100)));

        let result = LedgerService::validate_entry(input, Utc::now(), |a| match a {
            AccountRef::Id(id) if *id == foreign_bank.id => Ok(foreign_bank.clone()),
            other => chart.resolve(other),
        });
        assert!(matches!(result, Err(LedgerError::ChannelMismatch { .. })));
    }

    #[test]
    fn test_overflowing_lines_rejected() {
        let chart = Chart::new(&["CASH", "SALES"]);
        let result = LedgerService::validate_entry(
            chart.entry(&[("CASH", i64::MAX), ("CASH", 1), ("SALES", -1)]),
            Utc::now(),
            |a| chart.resolve(a),
        );
        assert_eq!(result.unwrap_err(), LedgerError::AmountOverflow);
    }

    #[test]
    fn test_source_id_bounds() {
        assert_eq!(
            LedgerService::validate_source_id(""),
            Err(LedgerError::InvalidSourceId(0))
        );
        assert!(LedgerService::validate_source_id(&"x".repeat(128)).is_ok());
        assert_eq!(
            LedgerService::validate_source_id(&"x".repeat(129)),
            Err(LedgerError::InvalidSourceId(129))
        );
    }

    #[test]
    fn test_transfer_entry_balances_and_tags() {
        let chart = Chart::new(&["CASH", "BANK"]);
        let input = TransferInput {
            channel_id: chart.channel,
            from: Chart::code("CASH"),
            to: Chart::code("BANK"),
            amount: Cents::new(5000),
            memo: Some("banking".into()),
            posted_by: None,
        };
        let entry = LedgerService::transfer_entry(input, "tr-1").unwrap();
        assert_eq!(entry.source_type, SourceType::InterAccountTransfer);
        assert_eq!(entry.lines[0].amount, Cents::new(5000));
        assert_eq!(entry.lines[1].amount, Cents::new(-5000));
        assert_eq!(
            entry.lines[1].metadata.get(MetadataKey::TransferId),
            Some("tr-1")
        );

        let validated =
            LedgerService::validate_entry(entry, Utc::now(), |a| chart.resolve(a)).unwrap();
        assert_eq!(validated.lines.len(), 2);
    }

    #[test]
    fn test_transfer_rejects_non_positive_amount() {
        let chart = Chart::new(&["CASH", "BANK"]);
        let mut input = TransferInput {
            channel_id: chart.channel,
            from: Chart::code("CASH"),
            to: Chart::code("BANK"),
            amount: Cents::ZERO,
            memo: None,
            posted_by: None,
        };
        assert!(matches!(
            LedgerService::transfer_entry(input.clone(), "t"),
            Err(LedgerError::NonPositiveTransfer(_))
        ));
        input.amount = Cents::new(-10);
        assert_eq!(
            LedgerService::transfer_entry(input, "t").unwrap_err(),
            LedgerError::NonPositiveTransfer(Cents::new(-10))
        );
    }
}
