//! Custody client errors

use thiserror::Error;

/// Errors from the custody client
#[derive(Debug, Error)]
pub enum CustodyError {
    /// API key or shared secret missing. This is a configuration problem
    /// raised before any network call, never a per-request failure.
    #[error("Fystack credentials not configured")]
    MissingCredentials,

    /// Non-2xx response from the provider, body parsed when possible
    #[error("Fystack HTTP {status}")]
    Provider {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for custody operations
pub type CustodyResult<T> = Result<T, CustodyError>;
