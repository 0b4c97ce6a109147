//! Errors surfaced by the callable operations.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use signup_common::{CallableError, CallableResponse, ErrorCode};

use crate::auth::AuthError;
use crate::mail::MailError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    FailedPrecondition(String),
    #[error("{0}")]
    DeadlineExceeded(String),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            ApiError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            ApiError::DeadlineExceeded(_) => ErrorCode::DeadlineExceeded,
            ApiError::Unauthenticated(_) => ErrorCode::Unauthenticated,
            ApiError::Store(_) => ErrorCode::Internal,
            ApiError::Mail(_) => ErrorCode::Unavailable,
        }
    }

    /// Message sent to the caller. Transport details stay in the log.
    fn public_message(&self) -> String {
        match self {
            ApiError::Store(_) => "Internal error".to_string(),
            ApiError::Mail(_) => "Email delivery failed".to_string(),
            ApiError::Unauthenticated(_) => "Missing or invalid ID token".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_callable(&self) -> CallableError {
        CallableError::new(self.code(), self.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(e) => tracing::error!("Store error: {}", e),
            ApiError::Mail(e) => tracing::error!("Mail error: {}", e),
            ApiError::Unauthenticated(e) => tracing::debug!("Rejected token: {}", e),
            _ => {}
        }

        let status = StatusCode::from_u16(self.code().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body: CallableResponse<()> = CallableResponse::Error(self.to_callable());
        (status, Json(body)).into_response()
    }
}
