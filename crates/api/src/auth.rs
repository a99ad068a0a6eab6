//! Bearer-token authentication
//!
//! Requests to protected routes carry `Authorization: Bearer <jwt>`.
//! The token is verified with the shared HS256 secret and the `sub`
//! claim becomes the acting user id for the rest of the request.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Authenticated user id, inserted as a request extension
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated("Missing authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthenticated("Invalid authorization header"))?;

    let data = decode::<Claims>(token, &state.jwt_key, &Validation::new(Algorithm::HS256))
        .map_err(|_| ApiError::unauthenticated("Invalid or expired token"))?;

    let user_id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ApiError::unauthenticated("Invalid token subject"))?;

    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}
