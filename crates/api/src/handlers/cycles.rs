//! Planning-cycle routes
//!
//! A workspace gets exactly one annual cycle at creation time; the
//! create route exists to reject extra cycles with a stable code.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use kubera_core::{Action, ErrorCode};
use kubera_persistence::{CycleRepo, CycleRow};
use kubera_workflow::{authorize, require_membership, Actor};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<CycleRow>>>> {
    require_membership(&state.pool, workspace_id, Actor::new(user_id)).await?;
    let cycles = CycleRepo::list_for_workspace(&state.pool, workspace_id).await?;
    Ok(ApiResponse::ok(cycles))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<CycleRow>>> {
    authorize(
        &state.pool,
        workspace_id,
        Actor::new(user_id),
        Action::ManageWorkspace,
    )
    .await?;
    Err(ApiError::new(
        ErrorCode::AnnualOnly,
        "Workspaces run a single annual cycle; additional cycles are not supported",
    ))
}
