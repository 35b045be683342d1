//! Cashier session repository.
//!
//! Sessions move `open -> closing -> closed`. Closing contends only on the
//! session's own row through a status-guarded update.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tally_core::ledger::{AccountInfo, AccountRef, BalanceScope};
use tally_core::reconciliation::{
    AdjustmentBuilder, Reconciliation, ReconciliationEngine, ReconciliationKind,
    ReconciliationStatus,
};
use tally_core::session::{
    CashierSession, CloseSessionInput, CloseSessionOutcome, OpenSessionInput, OpenSessionOutcome,
    SessionError, SessionStateMachine, SessionStatus,
};
use tally_shared::types::{ActorId, ChannelId, ReconciliationId, SessionId};
use tracing::info;

use super::account::AccountRepository;
use super::begin_consistent;
use super::ledger::LedgerRepository;
use super::reconciliation::ReconciliationRepository;
use crate::entities::cashier_sessions;
use crate::entities::sea_orm_active_enums::CashierSessionStatus;
use crate::error::{DbFailure, is_unique_violation};

/// Cashier session repository.
#[derive(Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
    accounts: AccountRepository,
    reconciliations: ReconciliationRepository,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        accounts: AccountRepository,
        reconciliations: ReconciliationRepository,
    ) -> Self {
        Self {
            db,
            accounts,
            reconciliations,
        }
    }

    /// Opens a session on a till and records its opening float.
    ///
    /// No ledger entry is posted.
    ///
    /// # Errors
    ///
    /// Returns `SessionAlreadyOpen` if the till has a session that is not
    /// closed, or a declaration error for the opening float.
    pub async fn open(
        &self,
        input: OpenSessionInput,
        opened_by: ActorId,
    ) -> Result<OpenSessionOutcome, SessionError> {
        SessionStateMachine::validate_till_id(&input.till_id)?;
        let till_id = input.till_id.trim().to_string();
        let channel_id = input.channel_id;

        let txn = self.db.begin().await.map_err(SessionError::from_db)?;

        if let Some(active) = Self::find_active_in(&txn, channel_id, &till_id).await? {
            return Err(SessionError::SessionAlreadyOpen {
                till_id,
                session_id: SessionId::from_uuid(active.id),
            });
        }

        let short_over = self.reconciliations.short_over_in(&txn, channel_id).await?;
        let mut declared: Vec<(AccountInfo, _)> = Vec::with_capacity(input.declared.len());
        for (code, amount) in &input.declared {
            let account = self.accounts.require_code_in(&txn, channel_id, code).await?;
            declared.push((account, *amount));
        }
        let lines = ReconciliationEngine::opening_lines(&declared, &short_over)?;

        let now = Utc::now();
        let session_id = SessionId::new();
        let opening = Reconciliation {
            id: ReconciliationId::new(),
            channel_id,
            kind: ReconciliationKind::Opening,
            status: ReconciliationStatus::Recorded,
            snapshot_at: now,
            session_id: Some(session_id),
            counted_by: opened_by,
            adjustment_entry_id: None,
            approval_request_id: None,
            decided_by: None,
            decided_at: None,
            lines,
        };
        ReconciliationRepository::insert_in(&txn, &opening).await?;

        let model = cashier_sessions::ActiveModel {
            id: Set(session_id.into_inner()),
            channel_id: Set(channel_id.into_inner()),
            till_id: Set(till_id.clone()),
            opened_by: Set(opened_by.into_inner()),
            opened_at: Set(now),
            closed_by: Set(None),
            closed_at: Set(None),
            status: Set(CashierSessionStatus::Open),
            opening_reconciliation_id: Set(opening.id.into_inner()),
            closing_reconciliation_id: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            // Lost a race on the active-till index; a retry reports the winner
            if is_unique_violation(&e) {
                SessionError::ConcurrentModification(session_id)
            } else {
                SessionError::from_db(e)
            }
        })?;

        txn.commit().await.map_err(SessionError::from_db)?;

        info!(
            session_id = %session_id,
            channel_id = %channel_id,
            till_id = %till_id,
            opened_by = %opened_by,
            accounts = opening.lines.len(),
            "Cashier session opened"
        );

        Ok(OpenSessionOutcome {
            session: to_session(model),
            opening,
        })
    }

    /// Gets a session by id.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no session has the id.
    pub async fn get(&self, id: SessionId) -> Result<CashierSession, SessionError> {
        cashier_sessions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(SessionError::from_db)?
            .map(to_session)
            .ok_or(SessionError::SessionNotFound(id))
    }

    /// Closes a session against a closing count.
    ///
    /// Allowed from `open`, or from `closing` when the held count was
    /// rejected. Variances within the channel threshold are posted against
    /// the short/over account and the session closes; a larger variance
    /// holds the session in `closing` until approval.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotOpen` or `AlreadyClosed` for a disallowed state,
    /// `ConcurrentModification` if another close won the row, or a
    /// reconciliation error for the count.
    pub async fn close(
        &self,
        session_id: SessionId,
        input: CloseSessionInput,
        closed_by: ActorId,
    ) -> Result<CloseSessionOutcome, SessionError> {
        let txn = begin_consistent(&self.db)
            .await
            .map_err(SessionError::from_db)?;

        let session = cashier_sessions::Entity::find_by_id(session_id.into_inner())
            .one(&txn)
            .await
            .map_err(SessionError::from_db)?
            .ok_or(SessionError::SessionNotFound(session_id))?;
        let observed = SessionStatus::from(session.status);
        let channel_id = ChannelId::from_uuid(session.channel_id);

        let closing_status = match session.closing_reconciliation_id {
            Some(id) => Some(
                ReconciliationRepository::load_in(&txn, ReconciliationId::from_uuid(id))
                    .await?
                    .status,
            ),
            None => None,
        };
        SessionStateMachine::check_close(session_id, observed, closing_status)?;

        let short_over = self.reconciliations.short_over_in(&txn, channel_id).await?;
        let declared = self
            .reconciliations
            .declared_ids_in(&txn, channel_id, &input.declared)
            .await?;

        let mut declared_accounts = Vec::with_capacity(input.declared.len());
        for code in input.declared.keys() {
            declared_accounts.push(self.accounts.require_code_in(&txn, channel_id, code).await?);
        }

        let opening = ReconciliationRepository::load_in(
            &txn,
            ReconciliationId::from_uuid(session.opening_reconciliation_id),
        )
        .await?;
        let mut opening_accounts = Vec::with_capacity(opening.lines.len());
        for line in &opening.lines {
            opening_accounts.push(
                self.accounts
                    .resolve_in(&txn, channel_id, &AccountRef::Id(line.account_id))
                    .await?,
            );
        }
        let system = AccountRepository::list_system_in(&txn, channel_id).await?;

        let scope = SessionStateMachine::closing_scope(
            &opening_accounts,
            &declared_accounts,
            &system,
            short_over.id,
        );

        let now = Utc::now();
        let activity = LedgerRepository::tagged_balances_in(
            &txn,
            &scope,
            now,
            &BalanceScope::session(session_id),
        )
        .await?;
        let scoped = SessionStateMachine::expected_balances(scope, &opening.lines, &activity)?;

        let lines = ReconciliationEngine::compute_lines(&scoped, &declared, &short_over)?;
        let policy = self.reconciliations.policy_in(&txn, channel_id).await?;
        let (status, approval_required) = ReconciliationEngine::status_for(&lines, policy);

        let mut reconciliation = Reconciliation {
            id: ReconciliationId::new(),
            channel_id,
            kind: ReconciliationKind::Closing,
            status,
            snapshot_at: now,
            session_id: Some(session_id),
            counted_by: closed_by,
            adjustment_entry_id: None,
            approval_request_id: None,
            decided_by: None,
            decided_at: None,
            lines,
        };
        let short_over_amount = AdjustmentBuilder::short_over_amount(&reconciliation.lines)?;
        if status == ReconciliationStatus::Posted {
            reconciliation.adjustment_entry_id = self
                .reconciliations
                .post_adjustment_in(&txn, &reconciliation, &short_over, closed_by)
                .await?;
        }
        if approval_required {
            self.reconciliations
                .hold_in(&txn, &mut reconciliation, policy)
                .await?;
        }
        ReconciliationRepository::insert_in(&txn, &reconciliation).await?;

        let next = SessionStateMachine::status_after_close(approval_required);
        let closed_at = (next == SessionStatus::Closed).then_some(now);
        let updated = cashier_sessions::Entity::update_many()
            .col_expr(
                cashier_sessions::Column::Status,
                Expr::value(CashierSessionStatus::from(next)),
            )
            .col_expr(
                cashier_sessions::Column::ClosingReconciliationId,
                Expr::value(reconciliation.id.into_inner()),
            )
            .col_expr(
                cashier_sessions::Column::ClosedBy,
                Expr::value(closed_by.into_inner()),
            )
            .col_expr(cashier_sessions::Column::ClosedAt, Expr::value(closed_at))
            .filter(cashier_sessions::Column::Id.eq(session_id.into_inner()))
            .filter(cashier_sessions::Column::Status.eq(session.status))
            .exec(&txn)
            .await
            .map_err(SessionError::from_db)?;
        if updated.rows_affected != 1 {
            return Err(SessionError::ConcurrentModification(session_id));
        }

        txn.commit().await.map_err(SessionError::from_db)?;

        info!(
            session_id = %session_id,
            reconciliation_id = %reconciliation.id,
            status = next.as_str(),
            short_over = %short_over_amount,
            "Cashier session close recorded"
        );

        if approval_required {
            self.reconciliations
                .request_external_approval(&mut reconciliation, policy)
                .await;
        }

        let session = self.get(session_id).await?;
        Ok(CloseSessionOutcome {
            session,
            reconciliation,
            approval_required,
        })
    }

    async fn find_active_in<C: ConnectionTrait>(
        conn: &C,
        channel_id: ChannelId,
        till_id: &str,
    ) -> Result<Option<cashier_sessions::Model>, SessionError> {
        cashier_sessions::Entity::find()
            .filter(cashier_sessions::Column::ChannelId.eq(channel_id.into_inner()))
            .filter(cashier_sessions::Column::TillId.eq(till_id))
            .filter(cashier_sessions::Column::Status.ne(CashierSessionStatus::Closed))
            .one(conn)
            .await
            .map_err(SessionError::from_db)
    }
}

/// Converts a stored session into its domain form.
pub(crate) fn to_session(model: cashier_sessions::Model) -> CashierSession {
    CashierSession {
        id: SessionId::from_uuid(model.id),
        channel_id: ChannelId::from_uuid(model.channel_id),
        till_id: model.till_id,
        opened_by: ActorId::from_uuid(model.opened_by),
        opened_at: model.opened_at,
        closed_by: model.closed_by.map(ActorId::from_uuid),
        closed_at: model.closed_at,
        status: model.status.into(),
        opening_reconciliation_id: ReconciliationId::from_uuid(model.opening_reconciliation_id),
        closing_reconciliation_id: model.closing_reconciliation_id.map(ReconciliationId::from_uuid),
    }
}
