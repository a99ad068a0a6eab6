//! Custody provider routes
//!
//! Read pass-throughs go straight to the provider; wallet creation also
//! persists a local wallet row carrying the provider's wallet id. The
//! webhook route is open and only appends to the inbox.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use kubera_core::Action;
use kubera_custody::{
    extract_wallet_id, CreateWalletRequest, FystackClient, WalletPurpose, WalletType,
};
use kubera_persistence::{WalletRepo, WalletRow};
use kubera_workflow::{authorize, ingest, Actor};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

fn client(state: &AppState) -> ApiResult<FystackClient> {
    Ok(FystackClient::new(state.fystack.as_ref().clone())?)
}

pub async fn assets(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Value>>> {
    let data = client(&state)?.list_assets().await?;
    Ok(ApiResponse::ok(data))
}

pub async fn networks(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Value>>> {
    let data = client(&state)?.list_networks().await?;
    Ok(ApiResponse::ok(data))
}

pub async fn workspace_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let data = client(&state)?.workspace_stats().await?;
    Ok(ApiResponse::ok(data))
}

pub async fn wallets(
    State(state): State<AppState>,
    axum::extract::Query(query): axum::extract::Query<Vec<(String, String)>>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
    let data = client(&state)?.list_wallets(&query).await?;
    Ok(ApiResponse::ok(data))
}

pub async fn wallet_creation_status(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let data = client(&state)?.wallet_creation_status(&wallet_id).await?;
    Ok(ApiResponse::ok(data))
}

pub async fn withdrawal(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let data = client(&state)?.get_withdrawal(&withdrawal_id).await?;
    Ok(ApiResponse::ok(data))
}

#[derive(Debug, Deserialize)]
pub struct CreateWalletBody {
    pub name: String,
    #[serde(default = "default_wallet_type")]
    pub wallet_type: WalletType,
    #[serde(default = "default_wallet_purpose")]
    pub wallet_purpose: WalletPurpose,
}

fn default_wallet_type() -> WalletType {
    WalletType::Standard
}

fn default_wallet_purpose() -> WalletPurpose {
    WalletPurpose::General
}

pub async fn create_wallet(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
    Json(body): Json<CreateWalletBody>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    authorize(
        &state.pool,
        workspace_id,
        Actor::new(user_id),
        Action::ManageWorkspace,
    )
    .await?;

    let response = client(&state)?
        .create_wallet(&CreateWalletRequest {
            name: body.name.clone(),
            wallet_type: body.wallet_type,
            wallet_purpose: body.wallet_purpose,
        })
        .await?;

    let wallet = WalletRow {
        id: Uuid::new_v4(),
        workspace_id,
        name: body.name,
        fystack_wallet_id: extract_wallet_id(&response),
        created_at: Utc::now(),
    };
    WalletRepo::insert(&state.pool, &wallet).await?;

    tracing::info!(wallet_id = %wallet.id, fystack_wallet_id = ?wallet.fystack_wallet_id, "wallet created");
    Ok(ApiResponse::ok(json!({
        "wallet": wallet,
        "provider": response,
    })))
}

pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<Value>> {
    ingest(&state.pool, &payload).await?;
    Ok(Json(json!({ "ok": true })))
}
