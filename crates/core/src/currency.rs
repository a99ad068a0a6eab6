//! CurrencyCode - Validated currency codes
//!
//! Workspaces carry an ISO 4217-like code ("USD", "USDC"). There is no
//! conversion between currencies anywhere in the system, so a validated
//! newtype is enough.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing currency codes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("Empty currency code")]
    Empty,

    #[error("Currency code too short (min 3 chars): {0}")]
    TooShort(String),

    #[error("Currency code too long (max 8 chars): {0}")]
    TooLong(String),

    #[error("Invalid currency code format: {0}")]
    InvalidFormat(String),
}

/// An ISO 4217-like currency code: 3-8 uppercase ASCII alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Default workspace currency
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn new(code: &str) -> Result<Self, CurrencyError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CurrencyError::Empty);
        }
        if code.len() < 3 {
            return Err(CurrencyError::TooShort(code.to_string()));
        }
        if code.len() > 8 {
            return Err(CurrencyError::TooLong(code.to_string()));
        }
        if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return Err(CurrencyError::InvalidFormat(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
