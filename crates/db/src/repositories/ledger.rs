//! Ledger repository: the only writer of journal entries and lines.
//!
//! Every post is validated by `LedgerService` before anything is written and
//! persisted in a single database transaction. Other repositories post
//! through [`LedgerRepository::post_in`] with their own transaction.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, Func, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::ledger::{
    AccountBalance, AccountCode, AccountInfo, AccountRef, BalanceScope, JournalEntry, JournalLine,
    LedgerError, LedgerService, LineMetadata, MetadataKey, PostEntryInput, TransferInput,
    ValidatedEntry,
};
use tally_shared::types::{
    AccountId, ActorId, ChannelId, Cents, JournalEntryId, JournalLineId, PageRequest,
    PageResponse,
};
use tracing::{debug, info};

use super::account::AccountRepository;
use crate::entities::{accounts, journal_entries, journal_line_tags, journal_lines};
use crate::error::DbFailure;

/// Ledger repository for posting and balance queries.
#[derive(Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    accounts: AccountRepository,
}

impl LedgerRepository {
    /// Creates a new ledger repository sharing the given account cache.
    #[must_use]
    pub const fn new(db: DatabaseConnection, accounts: AccountRepository) -> Self {
        Self { db, accounts }
    }

    /// Posts a journal entry.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the entry breaks a posting rule; nothing
    /// is written in that case.
    pub async fn post(&self, input: PostEntryInput) -> Result<JournalEntry, LedgerError> {
        let txn = self.db.begin().await.map_err(LedgerError::from_db)?;
        let entry = Self::post_in(&txn, &self.accounts, input).await?;
        txn.commit().await.map_err(LedgerError::from_db)?;
        Ok(entry)
    }

    /// Moves a positive amount between two accounts of one channel.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveTransfer` for zero or negative amounts, or any
    /// posting error.
    pub async fn transfer(&self, input: TransferInput) -> Result<JournalEntry, LedgerError> {
        let transfer_id = JournalEntryId::new().to_string();
        let entry = LedgerService::transfer_entry(input, &transfer_id)?;
        self.post(entry).await
    }

    /// Validates and writes an entry on an existing connection or transaction.
    pub(crate) async fn post_in<C: ConnectionTrait>(
        conn: &C,
        accounts: &AccountRepository,
        input: PostEntryInput,
    ) -> Result<JournalEntry, LedgerError> {
        // Resolve up front; lookup failures surface in validation order
        let mut resolved: HashMap<AccountRef, Result<AccountInfo, LedgerError>> = HashMap::new();
        for line in &input.lines {
            if resolved.contains_key(&line.account) {
                continue;
            }
            let result = accounts
                .resolve_in(conn, input.channel_id, &line.account)
                .await;
            if let Err(LedgerError::Database(message)) = result {
                return Err(LedgerError::Database(message));
            }
            resolved.insert(line.account.clone(), result);
        }

        let validated = LedgerService::validate_entry(input, Utc::now(), |reference| {
            resolved
                .get(reference)
                .cloned()
                .unwrap_or_else(|| Err(LedgerError::UnknownAccount(reference.to_string())))
        })?;

        let entry = Self::insert_entry(conn, validated).await?;
        info!(
            entry_id = %entry.id,
            channel_id = %entry.channel_id,
            source_type = entry.source_type.as_str(),
            source_id = %entry.source_id,
            lines = entry.lines.len(),
            "Journal entry posted"
        );
        Ok(entry)
    }

    async fn insert_entry<C: ConnectionTrait>(
        conn: &C,
        validated: ValidatedEntry,
    ) -> Result<JournalEntry, LedgerError> {
        let now = Utc::now();
        let entry_id = JournalEntryId::new();

        journal_entries::ActiveModel {
            id: Set(entry_id.into_inner()),
            channel_id: Set(validated.channel_id.into_inner()),
            source_type: Set(validated.source_type.into()),
            source_id: Set(validated.source_id.clone()),
            occurred_at: Set(validated.occurred_at),
            memo: Set(validated.memo.clone()),
            posted_by: Set(validated.posted_by.map(ActorId::into_inner)),
            created_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(LedgerError::from_db)?;

        let mut lines = Vec::with_capacity(validated.lines.len());
        for line in validated.lines {
            let line_id = JournalLineId::new();
            journal_lines::ActiveModel {
                id: Set(line_id.into_inner()),
                entry_id: Set(entry_id.into_inner()),
                channel_id: Set(validated.channel_id.into_inner()),
                account_id: Set(line.account_id.into_inner()),
                amount_cents: Set(line.amount.value()),
                position: Set(i32::try_from(line.position).map_err(|_| LedgerError::AmountOverflow)?),
                occurred_at: Set(validated.occurred_at),
                metadata_version: Set(i32::from(LineMetadata::CURRENT_VERSION)),
            }
            .insert(conn)
            .await
            .map_err(LedgerError::from_db)?;

            for (key, value) in line.metadata.iter() {
                journal_line_tags::ActiveModel {
                    line_id: Set(line_id.into_inner()),
                    tag_key: Set(key.as_str().to_string()),
                    tag_value: Set(value.to_string()),
                }
                .insert(conn)
                .await
                .map_err(LedgerError::from_db)?;
            }

            lines.push(JournalLine {
                id: line_id,
                entry_id,
                account_id: line.account_id,
                account_code: line.account_code,
                amount: line.amount,
                position: line.position,
                occurred_at: validated.occurred_at,
                metadata: line.metadata,
            });
        }

        Ok(JournalEntry {
            id: entry_id,
            channel_id: validated.channel_id,
            source_type: validated.source_type,
            source_id: validated.source_id,
            occurred_at: validated.occurred_at,
            memo: validated.memo,
            posted_by: validated.posted_by,
            created_at: now,
            lines,
        })
    }

    /// Gets an entry with its lines in position order.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if no entry has the id.
    pub async fn get_entry(&self, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        let entry = journal_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(LedgerError::from_db)?
            .ok_or(LedgerError::EntryNotFound(id))?;

        let line_models = journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.eq(entry.id))
            .order_by_asc(journal_lines::Column::Position)
            .all(&self.db)
            .await
            .map_err(LedgerError::from_db)?;
        let lines = Self::hydrate_lines(&self.db, line_models).await?;

        Ok(JournalEntry {
            id,
            channel_id: ChannelId::from_uuid(entry.channel_id),
            source_type: entry.source_type.into(),
            source_id: entry.source_id,
            occurred_at: entry.occurred_at,
            memo: entry.memo,
            posted_by: entry.posted_by.map(ActorId::from_uuid),
            created_at: entry.created_at,
            lines,
        })
    }

    /// Balance of an account up to and including `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAccount` if the account does not exist.
    pub async fn balance_as_of(
        &self,
        account_id: AccountId,
        as_of: DateTime<Utc>,
        scope: BalanceScope,
    ) -> Result<AccountBalance, LedgerError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.to_string()))?;
        let balance = Self::balance_in(&self.db, &account, as_of, &scope).await?;
        Ok(AccountBalance {
            account_id,
            as_of,
            scope,
            balance,
        })
    }

    /// Sums an account's lines on an existing connection or transaction.
    pub(crate) async fn balance_in<C: ConnectionTrait>(
        conn: &C,
        account: &AccountInfo,
        as_of: DateTime<Utc>,
        scope: &BalanceScope,
    ) -> Result<Cents, LedgerError> {
        // SUM over BIGINT is NUMERIC on PostgreSQL; cast back for decoding
        let total = SimpleExpr::from(Func::cast_as(
            Func::sum(Expr::col(journal_lines::Column::AmountCents)),
            Alias::new("BIGINT"),
        ));

        let mut query = journal_lines::Entity::find()
            .select_only()
            .column_as(total, "total")
            .filter(journal_lines::Column::ChannelId.eq(account.channel_id.into_inner()))
            .filter(journal_lines::Column::AccountId.eq(account.id.into_inner()))
            .filter(journal_lines::Column::OccurredAt.lte(as_of));

        if let BalanceScope::Tagged { key, value } = scope {
            query = query.filter(journal_lines::Column::Id.in_subquery(tag_subquery(*key, value)));
        }

        let total: Option<Option<i64>> = query
            .into_tuple()
            .one(conn)
            .await
            .map_err(LedgerError::from_db)?;

        let balance = Cents::new(total.flatten().unwrap_or(0));
        debug!(account_id = %account.id, %as_of, balance = %balance, "Balance computed");
        Ok(balance)
    }

    /// Session-scoped balances for several accounts at once.
    pub(crate) async fn tagged_balances_in<C: ConnectionTrait>(
        conn: &C,
        accounts: &[AccountInfo],
        as_of: DateTime<Utc>,
        scope: &BalanceScope,
    ) -> Result<BTreeMap<AccountId, Cents>, LedgerError> {
        let mut balances = BTreeMap::new();
        for account in accounts {
            let balance = Self::balance_in(conn, account, as_of, scope).await?;
            balances.insert(account.id, balance);
        }
        Ok(balances)
    }

    /// All lines in a channel carrying a tag, ordered by time then position.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn lines_by_tag(
        &self,
        channel_id: ChannelId,
        key: MetadataKey,
        value: &str,
    ) -> Result<Vec<JournalLine>, LedgerError> {
        let models = journal_lines::Entity::find()
            .filter(journal_lines::Column::ChannelId.eq(channel_id.into_inner()))
            .filter(journal_lines::Column::Id.in_subquery(tag_subquery(key, value)))
            .order_by_asc(journal_lines::Column::OccurredAt)
            .order_by_asc(journal_lines::Column::EntryId)
            .order_by_asc(journal_lines::Column::Position)
            .all(&self.db)
            .await
            .map_err(LedgerError::from_db)?;
        Self::hydrate_lines(&self.db, models).await
    }

    /// Lists an account's lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAccount` if the account does not exist.
    pub async fn list_account_lines(
        &self,
        account_id: AccountId,
        page: &PageRequest,
    ) -> Result<PageResponse<JournalLine>, LedgerError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.to_string()))?;

        let query = journal_lines::Entity::find()
            .filter(journal_lines::Column::ChannelId.eq(account.channel_id.into_inner()))
            .filter(journal_lines::Column::AccountId.eq(account.id.into_inner()));

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(LedgerError::from_db)?;

        let models = query
            .order_by_desc(journal_lines::Column::OccurredAt)
            .order_by_desc(journal_lines::Column::EntryId)
            .order_by_asc(journal_lines::Column::Position)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(LedgerError::from_db)?;
        let lines = Self::hydrate_lines(&self.db, models).await?;

        Ok(PageResponse::new(lines, page.page, page.page_size(), total))
    }

    /// Attaches account codes and upgraded metadata to stored lines.
    async fn hydrate_lines<C: ConnectionTrait>(
        conn: &C,
        models: Vec<journal_lines::Model>,
    ) -> Result<Vec<JournalLine>, LedgerError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let line_ids: Vec<_> = models.iter().map(|m| m.id).collect();
        let account_ids: Vec<_> = models.iter().map(|m| m.account_id).collect();

        let codes: HashMap<_, _> = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(account_ids))
            .all(conn)
            .await
            .map_err(LedgerError::from_db)?
            .into_iter()
            .map(|a| (a.id, a.code))
            .collect();

        let mut tags: HashMap<_, Vec<(String, String)>> = HashMap::new();
        for tag in journal_line_tags::Entity::find()
            .filter(journal_line_tags::Column::LineId.is_in(line_ids))
            .all(conn)
            .await
            .map_err(LedgerError::from_db)?
        {
            tags.entry(tag.line_id)
                .or_default()
                .push((tag.tag_key, tag.tag_value));
        }

        models
            .into_iter()
            .map(|model| {
                let version = u16::try_from(model.metadata_version).map_err(|_| {
                    LedgerError::InvalidMetadata(format!(
                        "invalid schema version {}",
                        model.metadata_version
                    ))
                })?;
                let metadata =
                    LineMetadata::from_versioned(version, tags.remove(&model.id).unwrap_or_default())?;
                let code = codes
                    .get(&model.account_id)
                    .ok_or_else(|| LedgerError::UnknownAccount(model.account_id.to_string()))?;

                Ok(JournalLine {
                    id: JournalLineId::from_uuid(model.id),
                    entry_id: JournalEntryId::from_uuid(model.entry_id),
                    account_id: AccountId::from_uuid(model.account_id),
                    account_code: AccountCode::parse(code)?,
                    amount: Cents::new(model.amount_cents),
                    position: u32::try_from(model.position)
                        .map_err(|_| LedgerError::AmountOverflow)?,
                    occurred_at: model.occurred_at,
                    metadata,
                })
            })
            .collect()
    }
}

/// Line ids carrying `key = value`.
fn tag_subquery(key: MetadataKey, value: &str) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(journal_line_tags::Column::LineId)
        .from(journal_line_tags::Entity)
        .and_where(journal_line_tags::Column::TagKey.eq(key.as_str()))
        .and_where(journal_line_tags::Column::TagValue.eq(value))
        .to_owned()
}
