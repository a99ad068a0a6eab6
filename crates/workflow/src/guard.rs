//! Membership / authorization guard
//!
//! Resolves a principal's role within one workspace and gates every
//! mutating operation. Lookups are fresh per request; authorization is
//! never based on state cached from an earlier call.

use crate::error::{WorkflowError, WorkflowResult};
use kubera_core::{Action, Role};
use kubera_persistence::{MemberRepo, MemberRow};
use sqlx::SqlitePool;
use uuid::Uuid;

/// The authenticated principal, passed explicitly into every workflow
/// operation. There is no ambient request context.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
}

impl Actor {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Resolve the actor's membership in a workspace, or fail with
/// a uniform forbidden error that does not reveal whether the
/// workspace exists.
pub async fn require_membership(
    pool: &SqlitePool,
    workspace_id: Uuid,
    actor: Actor,
) -> WorkflowResult<MemberRow> {
    MemberRepo::find(pool, workspace_id, actor.user_id)
        .await?
        .ok_or_else(|| WorkflowError::forbidden("Not a workspace member"))
}

/// Check the member's role against the authorization matrix.
pub fn require_role(member: &MemberRow, action: Action) -> WorkflowResult<Role> {
    let role = member.role()?;
    if role.can(action) {
        Ok(role)
    } else {
        Err(WorkflowError::forbidden("Insufficient role"))
    }
}

/// Membership plus role check in one step, the shape every mutating
/// endpoint uses.
pub async fn authorize(
    pool: &SqlitePool,
    workspace_id: Uuid,
    actor: Actor,
    action: Action,
) -> WorkflowResult<MemberRow> {
    let member = require_membership(pool, workspace_id, actor).await?;
    require_role(&member, action)?;
    Ok(member)
}
