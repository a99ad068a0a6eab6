//! Spending-proposal routes
//!
//! Thin adapters over the workflow crate: extract the actor from the
//! request, hand everything to the state machine, wrap the result in
//! the envelope.

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use kubera_core::ProposalStatus;
use kubera_custody::{CustodyResult, FystackClient, FystackConfig, WithdrawalRequest};
use kubera_persistence::{ApprovalRow, ProposalFilter, ProposalRow};
use kubera_workflow::{
    approve_proposal, create_proposal, list_proposals, proposal_with_approvals,
    reject_proposal, submit_proposal, Actor, ApproveRequest, ExecutionOutcome, NewProposal,
    WithdrawalExecutor,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Builds the custody client per withdrawal so approvals without
/// `execute` never touch credentials. Missing credentials surface as a
/// failed execution outcome, not a failed approval.
struct LazyFystack {
    config: FystackConfig,
}

#[async_trait]
impl WithdrawalExecutor for LazyFystack {
    async fn request_withdrawal(
        &self,
        wallet_external_id: &str,
        request: &WithdrawalRequest,
        idempotency_key: &str,
    ) -> CustodyResult<Value> {
        let client = FystackClient::new(self.config.clone())?;
        client
            .request_withdrawal(wallet_external_id, request, idempotency_key)
            .await
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub cycle_id: Option<Uuid>,
    pub status: Option<ProposalStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ProposalRow>>>> {
    let filter = ProposalFilter {
        cycle_id: query.cycle_id,
        status: query.status,
    };
    let proposals =
        list_proposals(&state.pool, Actor::new(user_id), workspace_id, filter).await?;
    Ok(ApiResponse::ok(proposals))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(input): Json<NewProposal>,
) -> ApiResult<Json<ApiResponse<ProposalRow>>> {
    let proposal = create_proposal(&state.pool, Actor::new(user_id), input).await?;
    Ok(ApiResponse::ok(proposal))
}

#[derive(serde::Serialize)]
pub struct ProposalDetail {
    #[serde(flatten)]
    pub proposal: ProposalRow,
    pub approvals: Vec<ApprovalRow>,
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ProposalDetail>>> {
    let (proposal, approvals) =
        proposal_with_approvals(&state.pool, Actor::new(user_id), proposal_id).await?;
    Ok(ApiResponse::ok(ProposalDetail {
        proposal,
        approvals,
    }))
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ProposalRow>>> {
    let proposal = submit_proposal(&state.pool, Actor::new(user_id), proposal_id).await?;
    Ok(ApiResponse::ok(proposal))
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(proposal_id): Path<Uuid>,
    body: Option<Json<ApproveRequest>>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    // An empty body is a plain approval without execution.
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let executor = LazyFystack {
        config: state.fystack.as_ref().clone(),
    };
    let outcome = approve_proposal(
        &state.pool,
        Actor::new(user_id),
        proposal_id,
        request,
        &executor,
    )
    .await?;
    Ok(ApiResponse::ok(json!({
        "proposal": outcome.proposal,
        "execution": execution_json(&outcome.execution),
    })))
}

fn execution_json(outcome: &ExecutionOutcome) -> Value {
    match outcome {
        ExecutionOutcome::NotRequested => json!({ "status": "not_requested" }),
        ExecutionOutcome::Executed {
            withdrawal_id,
            response,
        } => json!({
            "status": "executed",
            "withdrawal_id": withdrawal_id,
            "response": response,
        }),
        ExecutionOutcome::Failed { code, message } => json!({
            "status": "failed",
            "code": code,
            "message": message,
        }),
    }
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reason: Option<String>,
    pub comment: Option<String>,
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(proposal_id): Path<Uuid>,
    body: Option<Json<RejectBody>>,
) -> ApiResult<Json<ApiResponse<ProposalRow>>> {
    let body = body
        .map(|Json(b)| b)
        .ok_or_else(|| ApiError::validation("Rejection reason is required"))?;
    let reason = body.reason.unwrap_or_default();
    let proposal = reject_proposal(
        &state.pool,
        Actor::new(user_id),
        proposal_id,
        &reason,
        body.comment.as_deref(),
    )
    .await?;
    Ok(ApiResponse::ok(proposal))
}
