//! End-to-end workflow tests against an in-memory database
//!
//! Covers the role matrix, the draft/submit/approve/reject transitions,
//! and the split between the approval fact and the withdrawal fact.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use kubera_core::{ErrorCode, ProposalStatus, Role};
use kubera_custody::{CustodyError, CustodyResult, WithdrawalRequest};
use kubera_persistence::{
    ApprovalRepo, BudgetLineRepo, BudgetLineRow, Database, MemberRepo, ProposalFilter,
    ProposalRepo, WalletRow, WorkspaceRepo, WorkspaceRow,
};
use kubera_workflow::{
    approve_proposal, create_proposal, list_proposals, reject_proposal, submit_proposal,
    Actor, ApprovalOutcome, ApproveRequest, ExecutionOutcome, NewProposal, WithdrawalExecutor,
    WorkflowError,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

// === Mock executors ===

/// Succeeds with a fixed withdrawal id and counts invocations.
struct SuccessExecutor {
    withdrawal_id: &'static str,
    calls: AtomicU32,
}

impl SuccessExecutor {
    fn new(withdrawal_id: &'static str) -> Self {
        Self {
            withdrawal_id,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl WithdrawalExecutor for SuccessExecutor {
    async fn request_withdrawal(
        &self,
        _wallet_external_id: &str,
        _request: &WithdrawalRequest,
        _idempotency_key: &str,
    ) -> CustodyResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"data": {"id": self.withdrawal_id, "status": "pending"}}))
    }
}

/// Fails every call with a provider error.
struct FailingExecutor;

#[async_trait]
impl WithdrawalExecutor for FailingExecutor {
    async fn request_withdrawal(
        &self,
        _wallet_external_id: &str,
        _request: &WithdrawalRequest,
        _idempotency_key: &str,
    ) -> CustodyResult<Value> {
        Err(CustodyError::Provider {
            status: 503,
            body: json!({"error": "maintenance"}),
        })
    }
}

/// Panics when called; used to assert no execution was attempted.
struct NeverExecutor;

#[async_trait]
impl WithdrawalExecutor for NeverExecutor {
    async fn request_withdrawal(
        &self,
        _wallet_external_id: &str,
        _request: &WithdrawalRequest,
        _idempotency_key: &str,
    ) -> CustodyResult<Value> {
        panic!("withdrawal must not be attempted");
    }
}

// === Fixture ===

struct Fixture {
    db: Database,
    workspace_id: Uuid,
    cycle_id: Uuid,
    budget_line_id: Uuid,
    owner: Actor,
    proposer: Actor,
    approver: Actor,
    viewer: Actor,
}

impl Fixture {
    /// Workspace with a $10,000 budget line and one member per role.
    async fn new() -> Self {
        Self::with_db(Database::in_memory().await.unwrap()).await
    }

    async fn with_db(db: Database) -> Self {
        let owner = Actor::new(Uuid::new_v4());

        let workspace = WorkspaceRow {
            id: Uuid::new_v4(),
            name: "Superteam 2026".to_string(),
            currency: "USD".to_string(),
            start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap(),
            created_at: Utc::now(),
        };
        let cycle = WorkspaceRepo::create_annual(db.pool(), &workspace, owner.user_id)
            .await
            .unwrap();

        let line = BudgetLineRow {
            id: Uuid::new_v4(),
            cycle_id: cycle.id,
            code: "MKT-01".to_string(),
            name: "Marketing".to_string(),
            allocated: "10000".to_string(),
            parent_id: None,
            pic: None,
            notes: None,
            created_at: Utc::now(),
        };
        BudgetLineRepo::insert(db.pool(), &line).await.unwrap();

        let proposer = Actor::new(Uuid::new_v4());
        let approver = Actor::new(Uuid::new_v4());
        let viewer = Actor::new(Uuid::new_v4());
        for (actor, role) in [
            (proposer, Role::Proposer),
            (approver, Role::Approver),
            (viewer, Role::Viewer),
        ] {
            MemberRepo::upsert(db.pool(), workspace.id, actor.user_id, role)
                .await
                .unwrap();
        }

        Self {
            db,
            workspace_id: workspace.id,
            cycle_id: cycle.id,
            budget_line_id: line.id,
            owner,
            proposer,
            approver,
            viewer,
        }
    }

    fn new_proposal(&self, amount: rust_decimal::Decimal) -> NewProposal {
        NewProposal {
            workspace_id: self.workspace_id,
            cycle_id: self.cycle_id,
            budget_line_id: self.budget_line_id,
            amount,
            description: "Conference sponsorship".to_string(),
            justification: None,
            vendor_name: None,
            expected_date: None,
        }
    }

    /// Create and submit a $500 proposal as the proposer.
    async fn submitted_proposal(&self) -> Uuid {
        let proposal = create_proposal(self.db.pool(), self.proposer, self.new_proposal(dec!(500)))
            .await
            .unwrap();
        submit_proposal(self.db.pool(), self.proposer, proposal.id)
            .await
            .unwrap();
        proposal.id
    }

    /// Wallet linked (or not) to a provider wallet id.
    async fn wallet(&self, external_id: Option<&str>) -> Uuid {
        let wallet = WalletRow {
            id: Uuid::new_v4(),
            workspace_id: self.workspace_id,
            name: "Treasury".to_string(),
            fystack_wallet_id: external_id.map(str::to_string),
            created_at: Utc::now(),
        };
        kubera_persistence::WalletRepo::insert(self.db.pool(), &wallet)
            .await
            .unwrap();
        wallet.id
    }
}

fn execute_request(wallet_id: Uuid) -> ApproveRequest {
    ApproveRequest {
        comment: Some("approved for execution".to_string()),
        execute: true,
        wallet_id: Some(wallet_id),
        fystack_asset_id: Some("usdc-base".to_string()),
        recipient_address: Some("0xabc".to_string()),
    }
}

// === Creation and validation ===

#[tokio::test]
async fn non_positive_amount_rejected_before_persistence() {
    let fx = Fixture::new().await;

    for amount in [dec!(0), dec!(-500)] {
        let err = create_proposal(fx.db.pool(), fx.proposer, fx.new_proposal(amount))
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::Validation);
    }

    let proposals = ProposalRepo::list(fx.db.pool(), fx.workspace_id, &ProposalFilter::default())
        .await
        .unwrap();
    assert!(proposals.is_empty());
}

#[tokio::test]
async fn viewer_cannot_mutate_but_can_read() {
    let fx = Fixture::new().await;
    let proposal_id = fx.submitted_proposal().await;

    let err = create_proposal(fx.db.pool(), fx.viewer, fx.new_proposal(dec!(100)))
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let err = approve_proposal(
        fx.db.pool(),
        fx.viewer,
        proposal_id,
        ApproveRequest::default(),
        &NeverExecutor,
    )
    .await
    .err()
    .unwrap();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let err = reject_proposal(fx.db.pool(), fx.viewer, proposal_id, "no", None)
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    // Reads are open to every member.
    let listed = list_proposals(
        fx.db.pool(),
        fx.viewer,
        fx.workspace_id,
        ProposalFilter::default(),
    )
    .await
    .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn non_member_forbidden() {
    let fx = Fixture::new().await;
    let outsider = Actor::new(Uuid::new_v4());

    let err = list_proposals(
        fx.db.pool(),
        outsider,
        fx.workspace_id,
        ProposalFilter::default(),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, WorkflowError::Forbidden(_)));
}

// === Submit ===

#[tokio::test]
async fn only_submitter_can_submit() {
    let fx = Fixture::new().await;
    let proposal = create_proposal(fx.db.pool(), fx.proposer, fx.new_proposal(dec!(500)))
        .await
        .unwrap();

    // Another proposer-role member is still not the submitter.
    let other = Actor::new(Uuid::new_v4());
    MemberRepo::upsert(fx.db.pool(), fx.workspace_id, other.user_id, Role::Proposer)
        .await
        .unwrap();
    let err = submit_proposal(fx.db.pool(), other, proposal.id)
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let submitted = submit_proposal(fx.db.pool(), fx.proposer, proposal.id)
        .await
        .unwrap();
    assert_eq!(submitted.status().unwrap(), ProposalStatus::Submitted);

    // Submitting twice trips the draft precondition.
    let err = submit_proposal(fx.db.pool(), fx.proposer, proposal.id)
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

// === Approve / reject ===

#[tokio::test]
async fn approve_without_execute() {
    let fx = Fixture::new().await;
    let proposal_id = fx.submitted_proposal().await;

    let ApprovalOutcome {
        proposal,
        execution,
    } = approve_proposal(
        fx.db.pool(),
        fx.approver,
        proposal_id,
        ApproveRequest {
            comment: Some("within budget".to_string()),
            ..ApproveRequest::default()
        },
        &NeverExecutor,
    )
    .await
    .unwrap();

    assert_eq!(proposal.status().unwrap(), ProposalStatus::Approved);
    assert!(proposal.fystack_withdrawal_id.is_none());
    assert!(matches!(execution, ExecutionOutcome::NotRequested));

    let approvals = ApprovalRepo::list_for_proposal(fx.db.pool(), proposal_id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].approver_id, fx.approver.user_id);
    assert_eq!(approvals[0].comment.as_deref(), Some("within budget"));
}

#[tokio::test]
async fn approve_with_execute_persists_withdrawal_reference() {
    let fx = Fixture::new().await;
    let proposal_id = fx.submitted_proposal().await;
    let wallet_id = fx.wallet(Some("fw-treasury")).await;

    let executor = SuccessExecutor::new("wd-2026-001");
    let outcome = approve_proposal(
        fx.db.pool(),
        fx.approver,
        proposal_id,
        execute_request(wallet_id),
        &executor,
    )
    .await
    .unwrap();

    assert_eq!(outcome.proposal.status().unwrap(), ProposalStatus::Approved);
    assert_eq!(
        outcome.proposal.fystack_withdrawal_id.as_deref(),
        Some("wd-2026-001")
    );
    match outcome.execution {
        ExecutionOutcome::Executed { withdrawal_id, .. } => {
            assert_eq!(withdrawal_id.as_deref(), Some("wd-2026-001"));
        }
        other => panic!("expected Executed, got {other:?}"),
    }
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_execution_leaves_proposal_approved() {
    let fx = Fixture::new().await;
    let proposal_id = fx.submitted_proposal().await;
    let wallet_id = fx.wallet(Some("fw-treasury")).await;

    let outcome = approve_proposal(
        fx.db.pool(),
        fx.approver,
        proposal_id,
        execute_request(wallet_id),
        &FailingExecutor,
    )
    .await
    .unwrap();

    // Approval committed, payment did not happen, and the two are
    // distinguishable: Failed carries the provider code, the proposal
    // has no withdrawal reference.
    assert_eq!(outcome.proposal.status().unwrap(), ProposalStatus::Approved);
    assert!(outcome.proposal.fystack_withdrawal_id.is_none());
    match outcome.execution {
        ExecutionOutcome::Failed { code, .. } => assert_eq!(code, ErrorCode::ProviderError),
        other => panic!("expected Failed, got {other:?}"),
    }

    let approvals = ApprovalRepo::list_for_proposal(fx.db.pool(), proposal_id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
}

#[tokio::test]
async fn execute_with_missing_fields_reports_but_keeps_approval() {
    let fx = Fixture::new().await;
    let proposal_id = fx.submitted_proposal().await;

    let outcome = approve_proposal(
        fx.db.pool(),
        fx.approver,
        proposal_id,
        ApproveRequest {
            execute: true,
            ..ApproveRequest::default()
        },
        &NeverExecutor,
    )
    .await
    .unwrap();

    assert_eq!(outcome.proposal.status().unwrap(), ProposalStatus::Approved);
    match outcome.execution {
        ExecutionOutcome::Failed { code, message } => {
            assert_eq!(code, ErrorCode::MissingFields);
            assert!(message.contains("wallet_id"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn execute_requires_linked_wallet() {
    let fx = Fixture::new().await;
    let proposal_id = fx.submitted_proposal().await;
    let unlinked = fx.wallet(None).await;

    let outcome = approve_proposal(
        fx.db.pool(),
        fx.approver,
        proposal_id,
        execute_request(unlinked),
        &NeverExecutor,
    )
    .await
    .unwrap();

    match outcome.execution {
        ExecutionOutcome::Failed { code, message } => {
            assert_eq!(code, ErrorCode::NoFystackWallet);
            assert!(message.contains("not linked"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(outcome.proposal.fystack_withdrawal_id.is_none());

    // A wallet id that does not exist at all reports the same way.
    let second = fx.submitted_proposal().await;
    let outcome = approve_proposal(
        fx.db.pool(),
        fx.approver,
        second,
        execute_request(Uuid::new_v4()),
        &NeverExecutor,
    )
    .await
    .unwrap();
    match outcome.execution {
        ExecutionOutcome::Failed { code, .. } => {
            assert_eq!(code, ErrorCode::NoFystackWallet)
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn approving_a_draft_is_invalid_state() {
    let fx = Fixture::new().await;
    let proposal = create_proposal(fx.db.pool(), fx.proposer, fx.new_proposal(dec!(500)))
        .await
        .unwrap();

    let err = approve_proposal(
        fx.db.pool(),
        fx.approver,
        proposal.id,
        ApproveRequest::default(),
        &NeverExecutor,
    )
    .await
    .err()
    .unwrap();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    let unchanged = ProposalRepo::get_by_id(fx.db.pool(), proposal.id)
        .await
        .unwrap();
    assert_eq!(unchanged.status().unwrap(), ProposalStatus::Draft);
}

#[tokio::test]
async fn decision_lands_at_most_once() {
    let fx = Fixture::new().await;
    let proposal_id = fx.submitted_proposal().await;

    approve_proposal(
        fx.db.pool(),
        fx.approver,
        proposal_id,
        ApproveRequest::default(),
        &NeverExecutor,
    )
    .await
    .unwrap();

    // A second decision, approve or reject, fails its precondition and
    // never double-appends an audit row.
    let err = approve_proposal(
        fx.db.pool(),
        fx.owner,
        proposal_id,
        ApproveRequest::default(),
        &NeverExecutor,
    )
    .await
    .err()
    .unwrap();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    let err = reject_proposal(fx.db.pool(), fx.owner, proposal_id, "changed my mind", None)
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::InvalidState);

    let approvals = ApprovalRepo::list_for_proposal(fx.db.pool(), proposal_id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
}

#[tokio::test]
async fn racing_decisions_have_exactly_one_winner() {
    // A file-backed pool gives each decision its own connection, so the
    // two transactions genuinely race instead of queueing on a single
    // in-memory connection.
    let path = std::env::temp_dir().join(format!("kubera-race-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let fx = Fixture::with_db(Database::connect(&url).await.unwrap()).await;
    let proposal_id = fx.submitted_proposal().await;

    let approve = approve_proposal(
        fx.db.pool(),
        fx.approver,
        proposal_id,
        ApproveRequest::default(),
        &NeverExecutor,
    );
    let reject = reject_proposal(fx.db.pool(), fx.owner, proposal_id, "lost the race", None);
    let (approved, rejected) = tokio::join!(approve, reject);

    let loser = match (&approved, &rejected) {
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
        _ => panic!("expected exactly one decision to land"),
    };
    assert_eq!(loser.code(), ErrorCode::InvalidState);

    let approvals = ApprovalRepo::list_for_proposal(fx.db.pool(), proposal_id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);

    let final_status = ProposalRepo::get_by_id(fx.db.pool(), proposal_id)
        .await
        .unwrap()
        .status()
        .unwrap();
    match (&approved, &rejected) {
        (Ok(_), _) => assert_eq!(final_status, ProposalStatus::Approved),
        _ => assert_eq!(final_status, ProposalStatus::Rejected),
    }

    drop(fx);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

#[tokio::test]
async fn reject_requires_reason_and_persists_it() {
    let fx = Fixture::new().await;
    let proposal_id = fx.submitted_proposal().await;

    let err = reject_proposal(fx.db.pool(), fx.approver, proposal_id, "  ", None)
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::Validation);

    let rejected = reject_proposal(
        fx.db.pool(),
        fx.approver,
        proposal_id,
        "over budget",
        Some("see Q3 forecast"),
    )
    .await
    .unwrap();
    assert_eq!(rejected.status().unwrap(), ProposalStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("over budget"));

    let approvals = ApprovalRepo::list_for_proposal(fx.db.pool(), proposal_id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].comment.as_deref(), Some("see Q3 forecast"));
}

#[tokio::test]
async fn proposal_must_match_cycle_and_workspace() {
    let fx = Fixture::new().await;

    let mut input = fx.new_proposal(dec!(100));
    input.cycle_id = Uuid::new_v4();
    let err = create_proposal(fx.db.pool(), fx.proposer, input)
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let mut input = fx.new_proposal(dec!(100));
    input.budget_line_id = Uuid::new_v4();
    let err = create_proposal(fx.db.pool(), fx.proposer, input)
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::NotFound);
}
