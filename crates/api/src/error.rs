use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kubera_core::ErrorCode;
use kubera_custody::CustodyError;
use kubera_workflow::WorkflowError;

use crate::response::ApiResponse;

/// Error surfaced to HTTP clients. Internal errors are logged and the
/// message is replaced before leaving the process.
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidState
            | ErrorCode::MissingFields
            | ErrorCode::NoFystackWallet
            | ErrorCode::AnnualOnly
            | ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::ProviderError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.code == ErrorCode::InternalError {
            tracing::error!(error = %self.message, "internal error");
            "Internal server error".to_string()
        } else {
            self.message
        };
        (status, ApiResponse::fail(self.code, message)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<CustodyError> for ApiError {
    fn from(err: CustodyError) -> Self {
        match &err {
            CustodyError::MissingCredentials => {
                Self::new(ErrorCode::InternalError, err.to_string())
            }
            CustodyError::Provider { status, body } => Self::new(
                ErrorCode::ProviderError,
                format!("Custody provider returned {status}: {body}"),
            ),
            _ => Self::new(ErrorCode::ProviderError, err.to_string()),
        }
    }
}

impl From<kubera_persistence::PersistenceError> for ApiError {
    fn from(err: kubera_persistence::PersistenceError) -> Self {
        WorkflowError::from(err).into()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::new(ErrorCode::Forbidden, "x").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::new(ErrorCode::InvalidState, "x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::new(ErrorCode::ProviderError, "x").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::new(ErrorCode::AnnualOnly, "x").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_workflow_error_maps_code() {
        let err: ApiError = WorkflowError::InvalidState("already decided".into()).into();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }
}
