use jsonwebtoken::DecodingKey;
use kubera_custody::FystackConfig;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::AppConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub fystack: Arc<FystackConfig>,
    pub jwt_key: Arc<DecodingKey>,
}

impl AppState {
    pub fn new(config: &AppConfig, pool: SqlitePool) -> Self {
        Self {
            pool,
            fystack: Arc::new(config.fystack.clone()),
            jwt_key: Arc::new(DecodingKey::from_secret(config.jwt_secret.as_bytes())),
        }
    }
}
