//! Proposal state machine
//!
//! Legal transitions: `draft -> submitted -> {approved, rejected}`.
//! Approval/rejection appends an audit row and updates the status inside
//! one transaction; the optional withdrawal execution runs after that
//! transaction commits, as a best-effort follow-up whose failure never
//! rolls the approval back. Approval is the financial-authorization
//! fact; the withdrawal is the payment fact, and the two can diverge
//! when the provider is down.

use crate::error::{WorkflowError, WorkflowResult};
use crate::executor::WithdrawalExecutor;
use crate::guard::{authorize, require_membership, Actor};
use chrono::{DateTime, Utc};
use kubera_core::{Action, Amount, Decision, ErrorCode, ProposalStatus};
use kubera_custody::{extract_withdrawal_id, WithdrawalRequest};
use kubera_persistence::{
    ApprovalRepo, ApprovalRow, BudgetLineRepo, CycleRepo, ProposalFilter, ProposalRepo,
    ProposalRow, WalletRepo,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Input for creating a draft proposal
#[derive(Debug, Clone, Deserialize)]
pub struct NewProposal {
    pub workspace_id: Uuid,
    pub cycle_id: Uuid,
    pub budget_line_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub justification: Option<String>,
    pub vendor_name: Option<String>,
    pub expected_date: Option<DateTime<Utc>>,
}

/// Input for the approve transition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveRequest {
    pub comment: Option<String>,
    #[serde(default)]
    pub execute: bool,
    pub wallet_id: Option<Uuid>,
    pub fystack_asset_id: Option<String>,
    pub recipient_address: Option<String>,
}

/// What happened to the withdrawal after an approval committed.
///
/// `Failed` is distinct from `NotRequested`: the former means execution
/// was attempted (or requested with bad inputs) and the proposal stays
/// approved without a withdrawal reference.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    NotRequested,
    Executed {
        withdrawal_id: Option<String>,
        response: Value,
    },
    Failed {
        code: ErrorCode,
        message: String,
    },
}

/// Result of the approve transition
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub proposal: ProposalRow,
    pub execution: ExecutionOutcome,
}

/// Create a draft proposal. Validation runs before anything touches
/// storage: a non-positive amount or empty description never persists.
pub async fn create_proposal(
    pool: &SqlitePool,
    actor: Actor,
    input: NewProposal,
) -> WorkflowResult<ProposalRow> {
    let amount = Amount::positive(input.amount)
        .map_err(|e| WorkflowError::validation(e.to_string()))?;
    if input.description.trim().is_empty() {
        return Err(WorkflowError::validation("Description is required"));
    }

    authorize(pool, input.workspace_id, actor, Action::CreateProposal).await?;

    let cycle = CycleRepo::get_by_id(pool, input.cycle_id).await?;
    if cycle.workspace_id != input.workspace_id {
        return Err(WorkflowError::NotFound {
            entity: "Cycle",
            id: input.cycle_id.to_string(),
        });
    }
    let line = BudgetLineRepo::get_by_id(pool, input.budget_line_id).await?;
    if line.cycle_id != input.cycle_id {
        return Err(WorkflowError::NotFound {
            entity: "BudgetLine",
            id: input.budget_line_id.to_string(),
        });
    }

    let proposal = ProposalRow {
        id: Uuid::new_v4(),
        workspace_id: input.workspace_id,
        cycle_id: input.cycle_id,
        budget_line_id: input.budget_line_id,
        submitter_id: actor.user_id,
        amount: amount.to_string(),
        description: input.description,
        justification: input.justification,
        vendor_name: input.vendor_name,
        expected_date: input.expected_date,
        status: ProposalStatus::Draft.as_str().to_string(),
        rejection_reason: None,
        fystack_withdrawal_id: None,
        created_at: Utc::now(),
    };
    ProposalRepo::insert(pool, &proposal).await?;

    tracing::info!(proposal_id = %proposal.id, workspace_id = %proposal.workspace_id, "proposal created");
    Ok(proposal)
}

/// Submit a draft. Only the submitter may do this; the draft
/// precondition is enforced by the conditional update itself.
pub async fn submit_proposal(
    pool: &SqlitePool,
    actor: Actor,
    proposal_id: Uuid,
) -> WorkflowResult<ProposalRow> {
    let proposal = ProposalRepo::get_by_id(pool, proposal_id).await?;
    if proposal.submitter_id != actor.user_id {
        return Err(WorkflowError::forbidden("Only the submitter can submit"));
    }

    ProposalRepo::mark_submitted(pool, proposal_id)
        .await?
        .ok_or_else(|| {
            WorkflowError::invalid_state("Only draft proposals can be submitted")
        })
}

/// Approve a submitted proposal, optionally executing the spend as a
/// custody withdrawal once the approval has committed.
pub async fn approve_proposal(
    pool: &SqlitePool,
    actor: Actor,
    proposal_id: Uuid,
    request: ApproveRequest,
    executor: &dyn WithdrawalExecutor,
) -> WorkflowResult<ApprovalOutcome> {
    let proposal = ProposalRepo::get_by_id(pool, proposal_id).await?;
    authorize(pool, proposal.workspace_id, actor, Action::DecideProposal).await?;

    if proposal.status()? != ProposalStatus::Submitted {
        return Err(WorkflowError::invalid_state(
            "Only submitted proposals can be approved",
        ));
    }

    // The submitted precondition is re-checked inside this transaction;
    // a concurrent decision that got there first makes it return None.
    let approved = ProposalRepo::record_decision(
        pool,
        proposal_id,
        actor.user_id,
        Decision::Approved,
        request.comment.as_deref(),
        None,
    )
    .await?
    .ok_or_else(|| {
        WorkflowError::invalid_state("Only submitted proposals can be approved")
    })?;

    if !request.execute {
        return Ok(ApprovalOutcome {
            proposal: approved,
            execution: ExecutionOutcome::NotRequested,
        });
    }

    // The approval above is committed; everything from here on reports
    // into the execution outcome instead of failing the call.
    let execution = execute_withdrawal(pool, &approved, &request, executor).await;
    let proposal = ProposalRepo::get_by_id(pool, proposal_id).await?;
    Ok(ApprovalOutcome {
        proposal,
        execution,
    })
}

/// Fold a workflow error into the execution outcome; code and message
/// come from the error itself.
fn execution_failure(err: WorkflowError) -> ExecutionOutcome {
    ExecutionOutcome::Failed {
        code: err.code(),
        message: err.to_string(),
    }
}

async fn execute_withdrawal(
    pool: &SqlitePool,
    proposal: &ProposalRow,
    request: &ApproveRequest,
    executor: &dyn WithdrawalExecutor,
) -> ExecutionOutcome {
    let (wallet_id, asset_id, recipient) = match (
        request.wallet_id,
        request.fystack_asset_id.as_deref(),
        request.recipient_address.as_deref(),
    ) {
        (Some(w), Some(a), Some(r)) => (w, a, r),
        _ => {
            return execution_failure(WorkflowError::MissingFields(
                "wallet_id, fystack_asset_id, recipient_address".to_string(),
            ));
        }
    };

    let wallet = match WalletRepo::get_by_id(pool, wallet_id).await {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!(proposal_id = %proposal.id, %wallet_id, error = %e, "wallet lookup failed");
            return execution_failure(WorkflowError::NoLinkedWallet);
        }
    };
    let external_id = match &wallet.fystack_wallet_id {
        Some(id) if wallet.workspace_id == proposal.workspace_id => id.clone(),
        _ => return execution_failure(WorkflowError::NoLinkedWallet),
    };

    // Amount maps 1:1 to a USD stablecoin for now; the proposal amount
    // already travels as a decimal string.
    let withdrawal = WithdrawalRequest {
        asset_id: asset_id.to_string(),
        amount: proposal.amount.clone(),
        recipient_address: recipient.to_string(),
    };
    // Fresh key per logical attempt; the provider deduplicates retries
    // bearing the same key.
    let idempotency_key = Uuid::new_v4().to_string();

    let response = match executor
        .request_withdrawal(&external_id, &withdrawal, &idempotency_key)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(proposal_id = %proposal.id, error = %e, "withdrawal execution failed");
            return execution_failure(WorkflowError::Custody(e));
        }
    };

    let withdrawal_id = extract_withdrawal_id(&response);
    if let Some(id) = &withdrawal_id {
        // The withdrawal has been issued; a failure to persist the
        // reference must not be reported as an execution failure.
        if let Err(e) = ProposalRepo::set_withdrawal_reference(pool, proposal.id, id).await {
            tracing::error!(proposal_id = %proposal.id, error = %e, "failed to persist withdrawal reference");
        }
    }

    tracing::info!(proposal_id = %proposal.id, withdrawal_id = ?withdrawal_id, "withdrawal executed");
    ExecutionOutcome::Executed {
        withdrawal_id,
        response,
    }
}

/// Reject a submitted proposal. A reason is required and persists onto
/// the proposal; the audit row and status change share one transaction.
pub async fn reject_proposal(
    pool: &SqlitePool,
    actor: Actor,
    proposal_id: Uuid,
    reason: &str,
    comment: Option<&str>,
) -> WorkflowResult<ProposalRow> {
    if reason.trim().is_empty() {
        return Err(WorkflowError::validation("Rejection reason is required"));
    }

    let proposal = ProposalRepo::get_by_id(pool, proposal_id).await?;
    authorize(pool, proposal.workspace_id, actor, Action::DecideProposal).await?;

    if proposal.status()? != ProposalStatus::Submitted {
        return Err(WorkflowError::invalid_state(
            "Only submitted proposals can be rejected",
        ));
    }

    ProposalRepo::record_decision(
        pool,
        proposal_id,
        actor.user_id,
        Decision::Rejected,
        comment,
        Some(reason),
    )
    .await?
    .ok_or_else(|| {
        WorkflowError::invalid_state("Only submitted proposals can be rejected")
    })
}

/// List a workspace's proposals. Any member may read.
pub async fn list_proposals(
    pool: &SqlitePool,
    actor: Actor,
    workspace_id: Uuid,
    filter: ProposalFilter,
) -> WorkflowResult<Vec<ProposalRow>> {
    require_membership(pool, workspace_id, actor).await?;
    Ok(ProposalRepo::list(pool, workspace_id, &filter).await?)
}

/// A proposal together with its append-only decision history.
pub async fn proposal_with_approvals(
    pool: &SqlitePool,
    actor: Actor,
    proposal_id: Uuid,
) -> WorkflowResult<(ProposalRow, Vec<ApprovalRow>)> {
    let proposal = ProposalRepo::get_by_id(pool, proposal_id).await?;
    require_membership(pool, proposal.workspace_id, actor).await?;
    let approvals = ApprovalRepo::list_for_proposal(pool, proposal_id).await?;
    Ok((proposal, approvals))
}
