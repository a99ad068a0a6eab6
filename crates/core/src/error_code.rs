//! Stable machine-readable error codes for the API envelope
//!
//! Every error response carries one of these codes plus a human-readable
//! message. Clients match on the code, never the message.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthenticated,
    Forbidden,
    NotFound,
    InvalidState,
    MissingFields,
    NoFystackWallet,
    AnnualOnly,
    Validation,
    ProviderError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::MissingFields => "MISSING_FIELDS",
            ErrorCode::NoFystackWallet => "NO_FYSTACK_WALLET",
            ErrorCode::AnnualOnly => "ANNUAL_ONLY",
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
