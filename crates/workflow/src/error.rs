//! Workflow errors
//!
//! Every variant maps to a stable error code for the API envelope.
//! Persistence not-found errors surface as `NotFound`; everything else
//! from the storage layer is an internal error.

use kubera_core::ErrorCode;
use kubera_custody::CustodyError;
use kubera_persistence::PersistenceError;
use thiserror::Error;

/// Errors from workflow operations
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error("Missing fields: {0}")]
    MissingFields(String),

    #[error("Wallet not linked to fystack")]
    NoLinkedWallet,

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Persistence error: {0}")]
    Persistence(PersistenceError),
}

impl From<PersistenceError> for WorkflowError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { entity, id } => WorkflowError::NotFound { entity, id },
            other => WorkflowError::Persistence(other),
        }
    }
}

impl WorkflowError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable code for the API envelope
    pub fn code(&self) -> ErrorCode {
        match self {
            WorkflowError::Forbidden(_) => ErrorCode::Forbidden,
            WorkflowError::NotFound { .. } => ErrorCode::NotFound,
            WorkflowError::InvalidState(_) => ErrorCode::InvalidState,
            WorkflowError::Validation(_) => ErrorCode::Validation,
            WorkflowError::MissingFields(_) => ErrorCode::MissingFields,
            WorkflowError::NoLinkedWallet => ErrorCode::NoFystackWallet,
            WorkflowError::Custody(CustodyError::MissingCredentials) => ErrorCode::InternalError,
            WorkflowError::Custody(_) => ErrorCode::ProviderError,
            WorkflowError::Persistence(_) => ErrorCode::InternalError,
        }
    }
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
