//! Kubera Workflow - the proposal approval core
//!
//! Three collaborators around the spending-proposal state machine:
//! - `guard`: workspace-scoped membership and role checks
//! - `proposal`: the `draft -> submitted -> {approved, rejected}` state
//!   machine with atomic decision recording and best-effort withdrawal
//!   execution
//! - `webhook`: durable inbox for provider callbacks
//!
//! All state lives in the database; the principal and their membership
//! travel explicitly through every call.

pub mod error;
pub mod executor;
pub mod guard;
pub mod proposal;
pub mod webhook;

pub use error::{WorkflowError, WorkflowResult};
pub use executor::WithdrawalExecutor;
pub use guard::{authorize, require_membership, require_role, Actor};
pub use proposal::{
    approve_proposal, create_proposal, list_proposals, proposal_with_approvals,
    reject_proposal, submit_proposal, ApprovalOutcome, ApproveRequest, ExecutionOutcome,
    NewProposal,
};
pub use webhook::ingest;
