//! Reconciliation repository: snapshots, history and approval decisions.
//!
//! Snapshots read balances inside their own write transaction, under
//! repeatable read on PostgreSQL, so every row sees the same ledger state.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tally_core::approval::{ApprovalDecision, ApprovalGateway, ApprovalRequest};
use tally_core::ledger::{AccountCode, AccountInfo, BalanceScope, LedgerError};
use tally_core::reconciliation::{
    AdjustmentBuilder, Reconciliation, ReconciliationEngine, ReconciliationError,
    ReconciliationKind, ReconciliationLine, ReconciliationStatus, ScopedAccount, SnapshotInput,
    SnapshotOutcome, VariancePolicy,
};
use tally_core::session::{CashierSession, SessionStateMachine};
use tally_shared::types::{
    AccountId, ActorId, ApprovalRequestId, ChannelId, Cents, JournalEntryId, PageRequest,
    PageResponse, ReconciliationId, SessionId,
};
use tracing::{info, warn};

use super::account::AccountRepository;
use super::approval::{ApprovalOutbox, ApprovalRoute};
use super::begin_consistent;
use super::channel_settings::ChannelSettingsRepository;
use super::ledger::LedgerRepository;
use super::session::to_session;
use crate::entities::sea_orm_active_enums::{CashierSessionStatus, ReconStatus};
use crate::entities::{cashier_sessions, reconciliation_accounts, reconciliations};
use crate::error::DbFailure;

/// Result of applying an approval decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOutcome {
    /// The reconciliation after the decision.
    pub reconciliation: Reconciliation,
    /// The linked session after the decision, if any.
    pub session: Option<CashierSession>,
}

/// Reconciliation repository.
#[derive(Clone)]
pub struct ReconciliationRepository {
    db: DatabaseConnection,
    accounts: AccountRepository,
    settings: ChannelSettingsRepository,
    approvals: ApprovalRoute,
    short_over_code: AccountCode,
}

impl ReconciliationRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        accounts: AccountRepository,
        settings: ChannelSettingsRepository,
        approvals: ApprovalRoute,
        short_over_code: AccountCode,
    ) -> Self {
        Self {
            db,
            accounts,
            settings,
            approvals,
            short_over_code,
        }
    }

    /// Takes an ad-hoc snapshot of declared against expected balances.
    ///
    /// Linked to a session, expected is the session formula (opening float
    /// plus session-tagged activity); otherwise the channel-wide balance.
    ///
    /// # Errors
    ///
    /// Returns a scope or declaration error, or `LinkedSessionNotFound`.
    pub async fn snapshot(
        &self,
        input: SnapshotInput,
        counted_by: ActorId,
    ) -> Result<SnapshotOutcome, ReconciliationError> {
        let txn = begin_consistent(&self.db)
            .await
            .map_err(ReconciliationError::from_db)?;
        let channel_id = input.channel_id;
        let snapshot_at = Utc::now();

        let short_over = self.short_over_in(&txn, channel_id).await?;

        let mut scope = Vec::with_capacity(input.accounts.len());
        for code in &input.accounts {
            scope.push(self.accounts.require_code_in(&txn, channel_id, code).await?);
        }
        let declared = self
            .declared_ids_in(&txn, channel_id, &input.declared)
            .await?;

        let scoped = match input.session_id {
            Some(session_id) => {
                let opening = self
                    .session_opening_lines_in(&txn, channel_id, session_id)
                    .await?;
                let activity = LedgerRepository::tagged_balances_in(
                    &txn,
                    &scope,
                    snapshot_at,
                    &BalanceScope::session(session_id),
                )
                .await?;
                SessionStateMachine::expected_balances(scope, &opening, &activity)
                    .map_err(|_| LedgerError::AmountOverflow)?
            }
            None => {
                let mut scoped = Vec::with_capacity(scope.len());
                for account in scope {
                    let expected = LedgerRepository::balance_in(
                        &txn,
                        &account,
                        snapshot_at,
                        &BalanceScope::All,
                    )
                    .await?;
                    scoped.push(ScopedAccount { account, expected });
                }
                scoped
            }
        };

        let lines = ReconciliationEngine::compute_lines(&scoped, &declared, &short_over)?;
        let policy = self.policy_in(&txn, channel_id).await?;
        let (status, approval_required) = ReconciliationEngine::status_for(&lines, policy);

        let mut reconciliation = Reconciliation {
            id: ReconciliationId::new(),
            channel_id,
            kind: ReconciliationKind::Manual,
            status,
            snapshot_at,
            session_id: input.session_id,
            counted_by,
            adjustment_entry_id: None,
            approval_request_id: None,
            decided_by: None,
            decided_at: None,
            lines,
        };

        let total_variance = reconciliation.total_variance()?;
        if status == ReconciliationStatus::Posted {
            reconciliation.adjustment_entry_id = self
                .post_adjustment_in(&txn, &reconciliation, &short_over, counted_by)
                .await?;
        }
        if approval_required {
            self.hold_in(&txn, &mut reconciliation, policy).await?;
        }
        Self::insert_in(&txn, &reconciliation).await?;
        txn.commit().await.map_err(ReconciliationError::from_db)?;

        info!(
            reconciliation_id = %reconciliation.id,
            channel_id = %channel_id,
            status = %reconciliation.status,
            total_variance = %total_variance,
            "Reconciliation snapshot recorded"
        );

        if approval_required {
            self.request_external_approval(&mut reconciliation, policy)
                .await;
        }

        Ok(SnapshotOutcome {
            reconciliation,
            approval_required,
        })
    }

    /// Gets a reconciliation with its rows.
    ///
    /// # Errors
    ///
    /// Returns `ReconciliationNotFound` if no reconciliation has the id.
    pub async fn get(&self, id: ReconciliationId) -> Result<Reconciliation, ReconciliationError> {
        Self::load_in(&self.db, id).await
    }

    /// Lists a channel's reconciliations, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        channel_id: ChannelId,
        page: &PageRequest,
    ) -> Result<PageResponse<Reconciliation>, ReconciliationError> {
        let query = reconciliations::Entity::find()
            .filter(reconciliations::Column::ChannelId.eq(channel_id.into_inner()));

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(ReconciliationError::from_db)?;

        let headers = query
            .order_by_desc(reconciliations::Column::SnapshotAt)
            .order_by_desc(reconciliations::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(ReconciliationError::from_db)?;

        let ids: Vec<_> = headers.iter().map(|h| h.id).collect();
        let mut rows: HashMap<_, Vec<reconciliation_accounts::Model>> = HashMap::new();
        for row in reconciliation_accounts::Entity::find()
            .filter(reconciliation_accounts::Column::ReconciliationId.is_in(ids))
            .order_by_asc(reconciliation_accounts::Column::AccountCode)
            .all(&self.db)
            .await
            .map_err(ReconciliationError::from_db)?
        {
            rows.entry(row.reconciliation_id).or_default().push(row);
        }

        let data = headers
            .into_iter()
            .map(|header| {
                let lines = rows.remove(&header.id).unwrap_or_default();
                to_reconciliation(header, lines)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResponse::new(data, page.page, page.page_size(), total))
    }

    /// Applies an approval decision to a held reconciliation.
    ///
    /// Approval posts the deferred adjustment and closes a linked session
    /// waiting in `closing`. Rejection marks the reconciliation disputed and
    /// leaves the session waiting for a re-count.
    ///
    /// # Errors
    ///
    /// Returns `NotPendingApproval` unless the reconciliation is held.
    pub async fn resolve(
        &self,
        id: ReconciliationId,
        decision: ApprovalDecision,
        actor: ActorId,
    ) -> Result<ResolutionOutcome, ReconciliationError> {
        let txn = self.db.begin().await.map_err(ReconciliationError::from_db)?;

        let current = Self::load_in(&txn, id).await?;
        if current.status != ReconciliationStatus::PendingApproval {
            return Err(ReconciliationError::NotPendingApproval {
                id,
                status: current.status,
            });
        }

        let now = Utc::now();
        let (status, adjustment_entry_id) = match decision {
            ApprovalDecision::Approved => {
                let short_over = self.short_over_in(&txn, current.channel_id).await?;
                let entry_id = self
                    .post_adjustment_in(&txn, &current, &short_over, actor)
                    .await?;
                let status = if entry_id.is_some() {
                    ReconciliationStatus::Posted
                } else {
                    ReconciliationStatus::Recorded
                };
                (status, entry_id)
            }
            ApprovalDecision::Rejected => (ReconciliationStatus::Disputed, None),
        };

        let updated = reconciliations::Entity::update_many()
            .col_expr(
                reconciliations::Column::Status,
                Expr::value(ReconStatus::from(status)),
            )
            .col_expr(
                reconciliations::Column::AdjustmentEntryId,
                Expr::value(adjustment_entry_id.map(JournalEntryId::into_inner)),
            )
            .col_expr(
                reconciliations::Column::DecidedBy,
                Expr::value(actor.into_inner()),
            )
            .col_expr(reconciliations::Column::DecidedAt, Expr::value(now))
            .filter(reconciliations::Column::Id.eq(id.into_inner()))
            .filter(reconciliations::Column::Status.eq(ReconStatus::PendingApproval))
            .exec(&txn)
            .await
            .map_err(ReconciliationError::from_db)?;
        if updated.rows_affected != 1 {
            return Err(ReconciliationError::ConcurrentModification(id));
        }

        ApprovalOutbox::mark_decided_in(&txn, id.into_inner(), decision, actor, now)
            .await
            .map_err(|e| ReconciliationError::Database(e.to_string()))?;

        if let (ApprovalDecision::Approved, Some(session_id)) = (decision, current.session_id) {
            Self::close_held_session_in(&txn, session_id, id, now).await?;
        }

        let session = match current.session_id {
            Some(session_id) => cashier_sessions::Entity::find_by_id(session_id.into_inner())
                .one(&txn)
                .await
                .map_err(ReconciliationError::from_db)?
                .map(to_session),
            None => None,
        };
        let reconciliation = Self::load_in(&txn, id).await?;
        txn.commit().await.map_err(ReconciliationError::from_db)?;

        info!(
            reconciliation_id = %id,
            decision = ?decision,
            status = %reconciliation.status,
            decided_by = %actor,
            "Approval decision applied"
        );

        Ok(ResolutionOutcome {
            reconciliation,
            session,
        })
    }

    /// Moves a session held in `closing` on this reconciliation to `closed`.
    async fn close_held_session_in<C: ConnectionTrait>(
        conn: &C,
        session_id: SessionId,
        reconciliation_id: ReconciliationId,
        at: DateTime<Utc>,
    ) -> Result<(), ReconciliationError> {
        let closed = CashierSessionStatus::from(SessionStateMachine::status_after_decision(true));
        let result = cashier_sessions::Entity::update_many()
            .col_expr(cashier_sessions::Column::Status, Expr::value(closed))
            .col_expr(cashier_sessions::Column::ClosedAt, Expr::value(at))
            .filter(cashier_sessions::Column::Id.eq(session_id.into_inner()))
            .filter(cashier_sessions::Column::Status.eq(CashierSessionStatus::Closing))
            .filter(
                cashier_sessions::Column::ClosingReconciliationId
                    .eq(reconciliation_id.into_inner()),
            )
            .exec(conn)
            .await
            .map_err(ReconciliationError::from_db)?;

        if result.rows_affected == 1 {
            info!(session_id = %session_id, "Cashier session closed after approval");
        }
        Ok(())
    }

    /// Re-raises approval requests for held reconciliations without one.
    ///
    /// Picks up holds whose external gateway call failed after commit.
    /// Returns the reconciliations that now carry a request reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn request_missing_approvals(
        &self,
    ) -> Result<Vec<ReconciliationId>, ReconciliationError> {
        let orphans = reconciliations::Entity::find()
            .filter(reconciliations::Column::Status.eq(ReconStatus::PendingApproval))
            .filter(reconciliations::Column::ApprovalRequestId.is_null())
            .order_by_asc(reconciliations::Column::SnapshotAt)
            .all(&self.db)
            .await
            .map_err(ReconciliationError::from_db)?;

        let mut raised = Vec::with_capacity(orphans.len());
        for header in orphans {
            let id = ReconciliationId::from_uuid(header.id);
            let mut reconciliation = Self::load_in(&self.db, id).await?;
            let policy = self.policy_in(&self.db, reconciliation.channel_id).await?;

            match &self.approvals {
                ApprovalRoute::Outbox => {
                    let txn = self.db.begin().await.map_err(ReconciliationError::from_db)?;
                    let request_id = Self::enqueue_in(&txn, &reconciliation, policy).await?;
                    Self::set_request_id(&txn, id, request_id).await?;
                    txn.commit().await.map_err(ReconciliationError::from_db)?;
                    reconciliation.approval_request_id = Some(request_id);
                }
                ApprovalRoute::Gateway(_) => {
                    self.request_external_approval(&mut reconciliation, policy)
                        .await;
                }
            }

            if reconciliation.approval_request_id.is_some() {
                raised.push(id);
            }
        }

        if !raised.is_empty() {
            info!(count = raised.len(), "Missing approval requests raised");
        }
        Ok(raised)
    }

    /// Holds a reconciliation for approval inside the caller's transaction.
    ///
    /// With the outbox route the request row is written on `conn` and its
    /// reference set on the reconciliation before it is stored.
    pub(crate) async fn hold_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        reconciliation: &mut Reconciliation,
        policy: VariancePolicy,
    ) -> Result<(), ReconciliationError> {
        warn!(
            reconciliation_id = %reconciliation.id,
            threshold = %policy.threshold(),
            "Variance above threshold, holding for approval"
        );

        if let ApprovalRoute::Outbox = self.approvals {
            let request_id = Self::enqueue_in(conn, reconciliation, policy).await?;
            reconciliation.approval_request_id = Some(request_id);
        }
        Ok(())
    }

    /// Sends a committed hold to the external gateway and records the reference.
    ///
    /// Failures are logged; the reconciliation stays pending without one.
    pub(crate) async fn request_external_approval(
        &self,
        reconciliation: &mut Reconciliation,
        policy: VariancePolicy,
    ) {
        let ApprovalRoute::Gateway(gateway) = &self.approvals else {
            return;
        };

        let request =
            match ApprovalRequest::reconciliation_variance(reconciliation, policy.threshold()) {
                Ok(request) => request,
                Err(err) => {
                    warn!(
                        reconciliation_id = %reconciliation.id,
                        error = %err,
                        "Approval request could not be built; reconciliation left pending"
                    );
                    return;
                }
            };
        let request_id = match gateway.request_approval(request).await {
            Ok(request_id) => request_id,
            Err(err) => {
                warn!(
                    reconciliation_id = %reconciliation.id,
                    error = %err,
                    "Approval request failed; reconciliation left pending"
                );
                return;
            }
        };

        match Self::set_request_id(&self.db, reconciliation.id, request_id).await {
            Ok(()) => reconciliation.approval_request_id = Some(request_id),
            Err(err) => warn!(
                reconciliation_id = %reconciliation.id,
                request_id = %request_id,
                error = %err,
                "Failed to store approval request reference"
            ),
        }
    }

    async fn enqueue_in<C: ConnectionTrait>(
        conn: &C,
        reconciliation: &Reconciliation,
        policy: VariancePolicy,
    ) -> Result<ApprovalRequestId, ReconciliationError> {
        let request = ApprovalRequest::reconciliation_variance(reconciliation, policy.threshold())?;
        ApprovalOutbox::enqueue_in(conn, request)
            .await
            .map_err(|e| ReconciliationError::Database(e.to_string()))
    }

    async fn set_request_id<C: ConnectionTrait>(
        conn: &C,
        id: ReconciliationId,
        request_id: ApprovalRequestId,
    ) -> Result<(), ReconciliationError> {
        reconciliations::Entity::update_many()
            .col_expr(
                reconciliations::Column::ApprovalRequestId,
                Expr::value(request_id.into_inner()),
            )
            .filter(reconciliations::Column::Id.eq(id.into_inner()))
            .filter(reconciliations::Column::ApprovalRequestId.is_null())
            .exec(conn)
            .await
            .map_err(ReconciliationError::from_db)?;
        Ok(())
    }

    /// Builds and posts the short/over adjustment, if there is anything to post.
    pub(crate) async fn post_adjustment_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        reconciliation: &Reconciliation,
        short_over: &AccountInfo,
        posted_by: ActorId,
    ) -> Result<Option<JournalEntryId>, ReconciliationError> {
        let entry = AdjustmentBuilder::build(
            reconciliation.channel_id,
            reconciliation.id,
            reconciliation.session_id,
            &reconciliation.lines,
            short_over,
            posted_by,
        )?;

        match entry {
            Some(entry) => {
                let short_over_amount = AdjustmentBuilder::short_over_amount(&reconciliation.lines)?;
                let posted = LedgerRepository::post_in(conn, &self.accounts, entry).await?;
                info!(
                    reconciliation_id = %reconciliation.id,
                    entry_id = %posted.id,
                    short_over = %short_over_amount,
                    "Short/over adjustment posted"
                );
                Ok(Some(posted.id))
            }
            None => Ok(None),
        }
    }

    /// The channel's short/over account.
    pub(crate) async fn short_over_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        channel_id: ChannelId,
    ) -> Result<AccountInfo, LedgerError> {
        self.accounts
            .require_code_in(conn, channel_id, &self.short_over_code)
            .await
    }

    /// The channel's variance hold policy.
    pub(crate) async fn policy_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        channel_id: ChannelId,
    ) -> Result<VariancePolicy, ReconciliationError> {
        let resolved = self
            .settings
            .get_or_default_in(conn, channel_id)
            .await
            .map_err(ReconciliationError::from_db)?;
        Ok(VariancePolicy::new(
            resolved.settings.variance_notification_threshold,
        ))
    }

    /// Resolves declared codes to account ids.
    pub(crate) async fn declared_ids_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        channel_id: ChannelId,
        declared: &BTreeMap<AccountCode, Cents>,
    ) -> Result<BTreeMap<AccountId, Cents>, LedgerError> {
        let mut ids = BTreeMap::new();
        for (code, amount) in declared {
            let account = self.accounts.require_code_in(conn, channel_id, code).await?;
            ids.insert(account.id, *amount);
        }
        Ok(ids)
    }

    async fn session_opening_lines_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        channel_id: ChannelId,
        session_id: SessionId,
    ) -> Result<Vec<ReconciliationLine>, ReconciliationError> {
        let session = cashier_sessions::Entity::find_by_id(session_id.into_inner())
            .filter(cashier_sessions::Column::ChannelId.eq(channel_id.into_inner()))
            .one(conn)
            .await
            .map_err(ReconciliationError::from_db)?
            .ok_or(ReconciliationError::LinkedSessionNotFound(session_id))?;

        let opening = Self::load_in(
            conn,
            ReconciliationId::from_uuid(session.opening_reconciliation_id),
        )
        .await?;
        Ok(opening.lines)
    }

    /// Loads a reconciliation and its rows.
    pub(crate) async fn load_in<C: ConnectionTrait>(
        conn: &C,
        id: ReconciliationId,
    ) -> Result<Reconciliation, ReconciliationError> {
        let header = reconciliations::Entity::find_by_id(id.into_inner())
            .one(conn)
            .await
            .map_err(ReconciliationError::from_db)?
            .ok_or(ReconciliationError::ReconciliationNotFound(id))?;

        let rows = reconciliation_accounts::Entity::find()
            .filter(reconciliation_accounts::Column::ReconciliationId.eq(header.id))
            .order_by_asc(reconciliation_accounts::Column::AccountCode)
            .all(conn)
            .await
            .map_err(ReconciliationError::from_db)?;

        to_reconciliation(header, rows)
    }

    /// Writes a reconciliation and its rows.
    pub(crate) async fn insert_in<C: ConnectionTrait>(
        conn: &C,
        reconciliation: &Reconciliation,
    ) -> Result<(), ReconciliationError> {
        reconciliations::ActiveModel {
            id: Set(reconciliation.id.into_inner()),
            channel_id: Set(reconciliation.channel_id.into_inner()),
            kind: Set(reconciliation.kind.into()),
            status: Set(reconciliation.status.into()),
            snapshot_at: Set(reconciliation.snapshot_at),
            session_id: Set(reconciliation.session_id.map(SessionId::into_inner)),
            counted_by: Set(reconciliation.counted_by.into_inner()),
            adjustment_entry_id: Set(reconciliation
                .adjustment_entry_id
                .map(JournalEntryId::into_inner)),
            approval_request_id: Set(reconciliation
                .approval_request_id
                .map(ApprovalRequestId::into_inner)),
            decided_by: Set(reconciliation.decided_by.map(ActorId::into_inner)),
            decided_at: Set(reconciliation.decided_at),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(ReconciliationError::from_db)?;

        for line in &reconciliation.lines {
            reconciliation_accounts::ActiveModel {
                reconciliation_id: Set(reconciliation.id.into_inner()),
                account_id: Set(line.account_id.into_inner()),
                account_code: Set(line.account_code.to_string()),
                declared_amount_cents: Set(line.declared.value()),
                expected_amount_cents: Set(line.expected.value()),
                variance_cents: Set(line.variance.value()),
                is_system_account: Set(line.is_system_account),
            }
            .insert(conn)
            .await
            .map_err(ReconciliationError::from_db)?;
        }
        Ok(())
    }
}

fn to_reconciliation(
    header: reconciliations::Model,
    rows: Vec<reconciliation_accounts::Model>,
) -> Result<Reconciliation, ReconciliationError> {
    let lines = rows
        .into_iter()
        .map(|row| {
            Ok(ReconciliationLine {
                account_id: AccountId::from_uuid(row.account_id),
                account_code: AccountCode::parse(&row.account_code)?,
                declared: Cents::new(row.declared_amount_cents),
                expected: Cents::new(row.expected_amount_cents),
                variance: Cents::new(row.variance_cents),
                is_system_account: row.is_system_account,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    Ok(Reconciliation {
        id: ReconciliationId::from_uuid(header.id),
        channel_id: ChannelId::from_uuid(header.channel_id),
        kind: header.kind.into(),
        status: header.status.into(),
        snapshot_at: header.snapshot_at,
        session_id: header.session_id.map(SessionId::from_uuid),
        counted_by: ActorId::from_uuid(header.counted_by),
        adjustment_entry_id: header.adjustment_entry_id.map(JournalEntryId::from_uuid),
        approval_request_id: header.approval_request_id.map(ApprovalRequestId::from_uuid),
        decided_by: header.decided_by.map(ActorId::from_uuid),
        decided_at: header.decided_at,
        lines,
    })
}
