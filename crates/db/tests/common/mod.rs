//! Shared harness for repository integration tests.
//!
//! Every test gets its own in-memory SQLite database with the production
//! migrations applied and a seeded channel.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tally_core::approval::{ApprovalError, ApprovalGateway, ApprovalRequest};
use tally_core::channel::ChannelSettings;
use tally_core::costing::OversellPolicy;
use tally_core::ledger::{
    AccountCode, AccountInfo, LineMetadata, MetadataKey, PostEntryInput, PostLineInput,
    SourceType,
};
use tally_db::migration::{Migrator, MigratorTrait};
use tally_db::{
    AccountRepository, ApprovalOutbox, ApprovalRoute, ChannelSettingsRepository, InventoryOptions,
    InventoryRepository, LedgerRepository, ReconciliationRepository, SessionRepository,
};
use tally_shared::types::{ApprovalRequestId, ChannelId, Cents, SessionId};

/// Repositories wired the way the server wires them.
pub struct TestContext {
    pub db: DatabaseConnection,
    pub channel: ChannelId,
    pub accounts: AccountRepository,
    pub ledger: LedgerRepository,
    pub settings: ChannelSettingsRepository,
    pub inventory: InventoryRepository,
    pub reconciliations: ReconciliationRepository,
    pub sessions: SessionRepository,
    pub outbox: ApprovalOutbox,
}

impl TestContext {
    /// Looks up a seeded account by code.
    pub async fn account(&self, code: &str) -> AccountInfo {
        self.accounts
            .find_by_code(self.channel, &code_of(code))
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("account {code} not seeded"))
    }

    /// Current channel-wide balance of an account.
    pub async fn balance(&self, code: &str) -> Cents {
        let account = self.account(code).await;
        self.ledger
            .balance_as_of(account.id, chrono::Utc::now(), tally_core::ledger::BalanceScope::All)
            .await
            .unwrap()
            .balance
    }

    /// Posts a cash sale inside a session: CASH debit, SALES credit.
    pub async fn cash_sale(&self, session_id: SessionId, amount: i64) {
        let tags = LineMetadata::new().with(MetadataKey::OpenSessionId, session_id.to_string());
        self.ledger
            .post(PostEntryInput {
                channel_id: self.channel,
                source_type: SourceType::Sale,
                source_id: format!("order-{}", uuid::Uuid::new_v4()),
                occurred_at: None,
                memo: None,
                posted_by: None,
                lines: vec![
                    PostLineInput::new(code_of("CASH"), Cents::new(amount))
                        .with_metadata(tags.clone()),
                    PostLineInput::new(code_of("SALES"), Cents::new(-amount)).with_metadata(tags),
                ],
            })
            .await
            .unwrap();
    }

    /// Overrides the channel's variance threshold.
    pub async fn set_threshold(&self, cents: i64) {
        self.settings
            .upsert(
                self.channel,
                ChannelSettings {
                    variance_notification_threshold: Cents::new(cents),
                    oversell_policy: OversellPolicy::WholesaleEstimate,
                },
            )
            .await
            .unwrap();
    }
}

/// Parses an account code, panicking on invalid test input.
pub fn code_of(code: &str) -> AccountCode {
    AccountCode::parse(code).unwrap()
}

/// Builds a declaration map from `(code, cents)` pairs.
pub fn declared(pairs: &[(&str, i64)]) -> BTreeMap<AccountCode, Cents> {
    pairs
        .iter()
        .map(|(code, cents)| (code_of(code), Cents::new(*cents)))
        .collect()
}

/// A gateway that always fails.
pub struct FailingGateway;

#[async_trait]
impl ApprovalGateway for FailingGateway {
    async fn request_approval(
        &self,
        _request: ApprovalRequest,
    ) -> Result<ApprovalRequestId, ApprovalError> {
        Err(ApprovalError::Gateway("approval service unavailable".into()))
    }
}

/// A gateway that fails its first request and then writes to the outbox.
pub struct FlakyGateway {
    failed: AtomicBool,
    outbox: ApprovalOutbox,
}

impl FlakyGateway {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            failed: AtomicBool::new(false),
            outbox: ApprovalOutbox::new(db),
        }
    }
}

#[async_trait]
impl ApprovalGateway for FlakyGateway {
    async fn request_approval(
        &self,
        request: ApprovalRequest,
    ) -> Result<ApprovalRequestId, ApprovalError> {
        if self.failed.swap(true, Ordering::SeqCst) {
            self.outbox.request_approval(request).await
        } else {
            Err(ApprovalError::Gateway("approval service timed out".into()))
        }
    }
}

/// Sets up a migrated database with one seeded channel and the outbox route.
pub async fn setup() -> TestContext {
    setup_with(|_| ApprovalRoute::Outbox).await
}

/// Sets up a migrated database with a custom approval route.
pub async fn setup_with<F>(route: F) -> TestContext
where
    F: FnOnce(DatabaseConnection) -> ApprovalRoute,
{
    // One connection keeps every query on the same in-memory database
    let db = tally_db::connect("sqlite::memory:", 1, 1).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let accounts = AccountRepository::new(db.clone());
    let settings = ChannelSettingsRepository::new(
        db.clone(),
        ChannelSettings::defaults(Cents::new(1_000), OversellPolicy::WholesaleEstimate),
    );
    let ledger = LedgerRepository::new(db.clone(), accounts.clone());
    let inventory = InventoryRepository::new(
        db.clone(),
        accounts.clone(),
        settings.clone(),
        InventoryOptions {
            max_allocation_retries: 5,
            post_cogs_entries: true,
            cogs_account: code_of("COGS"),
            inventory_account: code_of("INVENTORY"),
        },
    );
    let reconciliations = ReconciliationRepository::new(
        db.clone(),
        accounts.clone(),
        settings.clone(),
        route(db.clone()),
        code_of("CASH_SHORT_OVER"),
    );
    let sessions = SessionRepository::new(db.clone(), accounts.clone(), reconciliations.clone());
    let outbox = ApprovalOutbox::new(db.clone());

    let channel = ChannelId::new();
    accounts.seed_defaults(channel).await.unwrap();

    TestContext {
        db,
        channel,
        accounts,
        ledger,
        settings,
        inventory,
        reconciliations,
        sessions,
        outbox,
    }
}
