//! Server configuration from environment variables

use anyhow::{bail, Context};
use kubera_custody::FystackConfig;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub fystack: FystackConfig,
}

impl AppConfig {
    /// Load config from environment variables.
    ///
    /// `KUBERA_JWT_SECRET` is required; custody credentials are not —
    /// without them the server runs and only custody operations fail.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret =
            env::var("KUBERA_JWT_SECRET").context("KUBERA_JWT_SECRET must be set")?;
        if jwt_secret.len() < 16 {
            bail!("KUBERA_JWT_SECRET must be at least 16 characters");
        }

        Ok(Self {
            host: env::var("KUBERA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("KUBERA_PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .unwrap_or(4000),
            database_url: env::var("KUBERA_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://kubera.db?mode=rwc".to_string()),
            jwt_secret,
            fystack: FystackConfig::from_env(),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
