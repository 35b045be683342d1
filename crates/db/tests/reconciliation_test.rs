//! Integration tests for ad-hoc reconciliation snapshots.

mod common;

use tally_core::approval::ApprovalDecision;
use tally_core::ledger::{LedgerError, PostEntryInput, PostLineInput, SourceType};
use tally_core::reconciliation::{
    ReconciliationError, ReconciliationKind, ReconciliationStatus, SnapshotInput,
};
use tally_shared::types::{ActorId, Cents, PageRequest, ReconciliationId, SessionId};

use common::{TestContext, code_of, declared, setup};

async fn take_cash(ctx: &TestContext, cash: i64) {
    ctx.ledger
        .post(PostEntryInput {
            channel_id: ctx.channel,
            source_type: SourceType::Sale,
            source_id: "order-1".to_string(),
            occurred_at: None,
            memo: None,
            posted_by: None,
            lines: vec![
                PostLineInput::new(code_of("CASH"), Cents::new(cash)),
                PostLineInput::new(code_of("SALES"), Cents::new(-cash)),
            ],
        })
        .await
        .unwrap();
}

fn snapshot(ctx: &TestContext, accounts: &[&str], pairs: &[(&str, i64)]) -> SnapshotInput {
    SnapshotInput {
        channel_id: ctx.channel,
        accounts: accounts.iter().map(|c| code_of(c)).collect(),
        declared: declared(pairs),
        session_id: None,
    }
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn test_matching_count_is_recorded() {
    let ctx = setup().await;
    take_cash(&ctx, 2_500).await;

    let outcome = ctx
        .reconciliations
        .snapshot(
            snapshot(&ctx, &["CASH", "CLEARING_CARD"], &[("CASH", 2_500)]),
            ActorId::new(),
        )
        .await
        .unwrap();

    let recon = &outcome.reconciliation;
    assert!(!outcome.approval_required);
    assert_eq!(recon.kind, ReconciliationKind::Manual);
    assert_eq!(recon.status, ReconciliationStatus::Recorded);
    let codes: Vec<_> = recon.lines.iter().map(|l| l.account_code.as_str()).collect();
    assert_eq!(codes, ["CASH", "CLEARING_CARD"]);
    assert_eq!(recon.lines[0].expected, Cents::new(2_500));
    assert!(recon.lines[1].is_system_account);
    assert_eq!(recon.lines[1].variance, Cents::ZERO);

    let stored = ctx.reconciliations.get(recon.id).await.unwrap();
    assert_eq!(stored.lines, recon.lines);
}

#[tokio::test]
async fn test_surplus_within_threshold_posts_adjustment() {
    let ctx = setup().await;
    take_cash(&ctx, 2_500).await;

    let outcome = ctx
        .reconciliations
        .snapshot(snapshot(&ctx, &["CASH"], &[("CASH", 3_000)]), ActorId::new())
        .await
        .unwrap();

    assert_eq!(outcome.reconciliation.status, ReconciliationStatus::Posted);
    assert!(outcome.reconciliation.adjustment_entry_id.is_some());
    assert_eq!(ctx.balance("CASH").await, Cents::new(3_000));
    assert_eq!(ctx.balance("CASH_SHORT_OVER").await, Cents::new(-500));
}

#[tokio::test]
async fn test_variance_at_threshold_is_not_held() {
    let ctx = setup().await;

    let outcome = ctx
        .reconciliations
        .snapshot(snapshot(&ctx, &["CASH"], &[("CASH", -1_000)]), ActorId::new())
        .await
        .unwrap();

    assert!(!outcome.approval_required);
    assert_eq!(outcome.reconciliation.status, ReconciliationStatus::Posted);
}

#[tokio::test]
async fn test_held_manual_snapshot_can_be_approved() {
    let ctx = setup().await;

    let held = ctx
        .reconciliations
        .snapshot(snapshot(&ctx, &["BANK"], &[("BANK", 50_000)]), ActorId::new())
        .await
        .unwrap();
    assert!(held.approval_required);
    assert_eq!(ctx.outbox.list_pending().await.unwrap().len(), 1);

    let resolved = ctx
        .reconciliations
        .resolve(held.reconciliation.id, ApprovalDecision::Approved, ActorId::new())
        .await
        .unwrap();

    assert!(resolved.session.is_none());
    assert_eq!(resolved.reconciliation.status, ReconciliationStatus::Posted);
    assert_eq!(ctx.balance("BANK").await, Cents::new(50_000));
}

#[tokio::test]
async fn test_deciding_twice_is_rejected() {
    let ctx = setup().await;
    let held = ctx
        .reconciliations
        .snapshot(snapshot(&ctx, &["BANK"], &[("BANK", 50_000)]), ActorId::new())
        .await
        .unwrap();
    ctx.reconciliations
        .resolve(held.reconciliation.id, ApprovalDecision::Rejected, ActorId::new())
        .await
        .unwrap();

    let err = ctx
        .reconciliations
        .resolve(held.reconciliation.id, ApprovalDecision::Approved, ActorId::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReconciliationError::NotPendingApproval {
            id: held.reconciliation.id,
            status: ReconciliationStatus::Disputed,
        }
    );
}

// ============================================================================
// Scope errors
// ============================================================================

#[tokio::test]
async fn test_missing_declaration_is_rejected() {
    let ctx = setup().await;

    let err = ctx
        .reconciliations
        .snapshot(snapshot(&ctx, &["CASH", "BANK"], &[("CASH", 0)]), ActorId::new())
        .await
        .unwrap_err();

    assert_eq!(err, ReconciliationError::MissingDeclaration("BANK".to_string()));
}

#[tokio::test]
async fn test_declaring_system_account_is_rejected() {
    let ctx = setup().await;

    let err = ctx
        .reconciliations
        .snapshot(
            snapshot(&ctx, &["CLEARING_MPESA"], &[("CLEARING_MPESA", 100)]),
            ActorId::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReconciliationError::ManualDeclarationOnSystemAccount("CLEARING_MPESA".to_string())
    );
}

#[tokio::test]
async fn test_short_over_account_cannot_be_reconciled() {
    let ctx = setup().await;

    let err = ctx
        .reconciliations
        .snapshot(snapshot(&ctx, &["CASH_SHORT_OVER"], &[]), ActorId::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ReconciliationError::ShortOverAccountInScope("CASH_SHORT_OVER".to_string())
    );
}

#[tokio::test]
async fn test_declaration_outside_scope_is_rejected() {
    let ctx = setup().await;

    let err = ctx
        .reconciliations
        .snapshot(
            snapshot(&ctx, &["CASH"], &[("CASH", 0), ("BANK", 0)]),
            ActorId::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReconciliationError::DeclarationOutsideScope(_)));
}

#[tokio::test]
async fn test_empty_scope_is_rejected() {
    let ctx = setup().await;

    let err = ctx
        .reconciliations
        .snapshot(snapshot(&ctx, &[], &[]), ActorId::new())
        .await
        .unwrap_err();

    assert_eq!(err, ReconciliationError::EmptyScope);
}

#[tokio::test]
async fn test_unknown_linked_session() {
    let ctx = setup().await;
    let session_id = SessionId::new();
    let mut input = snapshot(&ctx, &["CASH"], &[("CASH", 0)]);
    input.session_id = Some(session_id);

    let err = ctx
        .reconciliations
        .snapshot(input, ActorId::new())
        .await
        .unwrap_err();

    assert_eq!(err, ReconciliationError::LinkedSessionNotFound(session_id));
}

// ============================================================================
// Lookups
// ============================================================================

#[tokio::test]
async fn test_list_is_newest_first() {
    let ctx = setup().await;
    let mut ids = Vec::new();
    for cash in [0, 0, 0] {
        let outcome = ctx
            .reconciliations
            .snapshot(snapshot(&ctx, &["CASH"], &[("CASH", cash)]), ActorId::new())
            .await
            .unwrap();
        ids.push(outcome.reconciliation.id);
    }

    let page = ctx
        .reconciliations
        .list(ctx.channel, &PageRequest { page: 1, per_page: 2 })
        .await
        .unwrap();

    assert_eq!(page.meta.total, 3);
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].id, ids[2]);
    assert_eq!(page.data[0].lines.len(), 1);
}

#[tokio::test]
async fn test_missing_reconciliation_is_not_found() {
    let ctx = setup().await;
    let id = ReconciliationId::new();

    let err = ctx.reconciliations.get(id).await.unwrap_err();

    assert_eq!(err, ReconciliationError::ReconciliationNotFound(id));
}

#[tokio::test]
async fn test_list_reports_served_page_size() {
    let ctx = setup().await;
    ctx.reconciliations
        .snapshot(snapshot(&ctx, &["CASH"], &[("CASH", 0)]), ActorId::new())
        .await
        .unwrap();

    let page = ctx
        .reconciliations
        .list(ctx.channel, &PageRequest { page: 1, per_page: 10_000 })
        .await
        .unwrap();

    assert_eq!(page.meta.per_page, PageRequest::MAX_PER_PAGE);
    assert_eq!(page.meta.total_pages, 1);
}

#[tokio::test]
async fn test_unsummable_declarations_store_nothing() {
    let ctx = setup().await;

    let err = ctx
        .reconciliations
        .snapshot(
            snapshot(
                &ctx,
                &["BANK", "CASH"],
                &[("BANK", i64::MAX), ("CASH", i64::MAX)],
            ),
            ActorId::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err, ReconciliationError::Ledger(LedgerError::AmountOverflow));
    let page = ctx
        .reconciliations
        .list(ctx.channel, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.meta.total, 0);
    assert!(ctx.outbox.list_pending().await.unwrap().is_empty());
}
