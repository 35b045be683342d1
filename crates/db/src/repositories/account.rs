//! Account repository for the channel chart of accounts.
//!
//! Accounts are created once and never change, so lookups are cached by id
//! and by `(channel, code)`.

use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tally_core::ledger::{AccountCode, AccountInfo, AccountRef, DEFAULT_ACCOUNTS, LedgerError};
use tally_shared::types::{AccountId, ChannelId};
use tracing::info;

use crate::entities::accounts;
use crate::error::{DbFailure, is_unique_violation};

/// Default cache capacity (number of accounts).
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Idle time after which a cached account is dropped (1 hour).
const DEFAULT_IDLE_SECS: u64 = 3_600;

/// Account repository with an immutable-data cache.
#[derive(Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
    by_id: Cache<AccountId, AccountInfo>,
    by_code: Cache<(ChannelId, AccountCode), AccountInfo>,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            by_id: Cache::builder()
                .max_capacity(DEFAULT_CACHE_CAPACITY)
                .time_to_idle(Duration::from_secs(DEFAULT_IDLE_SECS))
                .build(),
            by_code: Cache::builder()
                .max_capacity(DEFAULT_CACHE_CAPACITY)
                .time_to_idle(Duration::from_secs(DEFAULT_IDLE_SECS))
                .build(),
        }
    }

    /// Creates an account in a channel.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateAccountCode` if the code is taken in the channel.
    pub async fn create(
        &self,
        channel_id: ChannelId,
        code: AccountCode,
        name: &str,
        is_system_account: bool,
    ) -> Result<AccountInfo, LedgerError> {
        let existing = self.find_in(&self.db, channel_id, &code).await?;
        if existing.is_some() {
            return Err(LedgerError::DuplicateAccountCode(code.to_string()));
        }

        let account = Self::insert_in(&self.db, channel_id, &code, name, is_system_account).await?;
        info!(channel_id = %channel_id, code = %account.code, "Account created");
        Ok(account)
    }

    /// Seeds the default chart for a channel, skipping codes that exist.
    ///
    /// Returns the channel's full chart after seeding.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn seed_defaults(&self, channel_id: ChannelId) -> Result<Vec<AccountInfo>, LedgerError> {
        let txn = self.db.begin().await.map_err(LedgerError::from_db)?;

        let mut created = 0usize;
        for default in DEFAULT_ACCOUNTS {
            let code = AccountCode::parse(default.code)?;
            if self.find_in(&txn, channel_id, &code).await?.is_none() {
                Self::insert_in(&txn, channel_id, &code, default.name, default.is_system_account)
                    .await?;
                created += 1;
            }
        }

        txn.commit().await.map_err(LedgerError::from_db)?;
        info!(channel_id = %channel_id, created, "Default chart of accounts seeded");

        self.list(channel_id).await
    }

    /// Lists a channel's accounts in code order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, channel_id: ChannelId) -> Result<Vec<AccountInfo>, LedgerError> {
        Self::list_in(&self.db, channel_id).await
    }

    /// Lists a channel's system accounts in code order.
    pub(crate) async fn list_system_in<C: ConnectionTrait>(
        conn: &C,
        channel_id: ChannelId,
    ) -> Result<Vec<AccountInfo>, LedgerError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::ChannelId.eq(channel_id.into_inner()))
            .filter(accounts::Column::IsSystemAccount.eq(true))
            .order_by_asc(accounts::Column::Code)
            .all(conn)
            .await
            .map_err(LedgerError::from_db)?;
        models.into_iter().map(to_info).collect()
    }

    async fn list_in<C: ConnectionTrait>(
        conn: &C,
        channel_id: ChannelId,
    ) -> Result<Vec<AccountInfo>, LedgerError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::ChannelId.eq(channel_id.into_inner()))
            .order_by_asc(accounts::Column::Code)
            .all(conn)
            .await
            .map_err(LedgerError::from_db)?;
        models.into_iter().map(to_info).collect()
    }

    /// Finds an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: AccountId) -> Result<Option<AccountInfo>, LedgerError> {
        self.find_by_id_in(&self.db, id).await
    }

    /// Finds an account by code within a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(
        &self,
        channel_id: ChannelId,
        code: &AccountCode,
    ) -> Result<Option<AccountInfo>, LedgerError> {
        self.find_in(&self.db, channel_id, code).await
    }

    /// Resolves a line's account reference.
    ///
    /// Codes resolve within `channel_id` only; ids resolve globally so the
    /// caller can report a channel mismatch.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAccount` if nothing matches.
    pub(crate) async fn resolve_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        channel_id: ChannelId,
        reference: &AccountRef,
    ) -> Result<AccountInfo, LedgerError> {
        let found = match reference {
            AccountRef::Id(id) => self.find_by_id_in(conn, *id).await?,
            AccountRef::Code(code) => self.find_in(conn, channel_id, code).await?,
        };
        found.ok_or_else(|| LedgerError::UnknownAccount(reference.to_string()))
    }

    /// Resolves a code within a channel, failing if it does not exist.
    pub(crate) async fn require_code_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        channel_id: ChannelId,
        code: &AccountCode,
    ) -> Result<AccountInfo, LedgerError> {
        self.find_in(conn, channel_id, code)
            .await?
            .ok_or_else(|| LedgerError::UnknownAccount(code.to_string()))
    }

    async fn find_by_id_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: AccountId,
    ) -> Result<Option<AccountInfo>, LedgerError> {
        if let Some(hit) = self.by_id.get(&id).await {
            return Ok(Some(hit));
        }
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(conn)
            .await
            .map_err(LedgerError::from_db)?;
        match model {
            Some(model) => {
                let info = to_info(model)?;
                self.remember(&info).await;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    async fn find_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        channel_id: ChannelId,
        code: &AccountCode,
    ) -> Result<Option<AccountInfo>, LedgerError> {
        let key = (channel_id, code.clone());
        if let Some(hit) = self.by_code.get(&key).await {
            return Ok(Some(hit));
        }
        let model = accounts::Entity::find()
            .filter(accounts::Column::ChannelId.eq(channel_id.into_inner()))
            .filter(accounts::Column::Code.eq(code.as_str()))
            .one(conn)
            .await
            .map_err(LedgerError::from_db)?;
        match model {
            Some(model) => {
                let info = to_info(model)?;
                self.remember(&info).await;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    async fn remember(&self, info: &AccountInfo) {
        self.by_id.insert(info.id, info.clone()).await;
        self.by_code
            .insert((info.channel_id, info.code.clone()), info.clone())
            .await;
    }

    async fn insert_in<C: ConnectionTrait>(
        conn: &C,
        channel_id: ChannelId,
        code: &AccountCode,
        name: &str,
        is_system_account: bool,
    ) -> Result<AccountInfo, LedgerError> {
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            channel_id: Set(channel_id.into_inner()),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            is_system_account: Set(is_system_account),
            created_at: Set(Utc::now()),
        };

        let model = account.insert(conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::DuplicateAccountCode(code.to_string())
            } else {
                LedgerError::from_db(e)
            }
        })?;
        to_info(model)
    }
}

/// Converts a stored account into its domain form.
pub(crate) fn to_info(model: accounts::Model) -> Result<AccountInfo, LedgerError> {
    Ok(AccountInfo {
        id: AccountId::from_uuid(model.id),
        channel_id: ChannelId::from_uuid(model.channel_id),
        code: AccountCode::parse(&model.code)?,
        name: model.name,
        is_system_account: model.is_system_account,
    })
}
