//! Callable-function wire envelope.
//!
//! Every operation is exposed as `POST /v1/<name>` and speaks the
//! callable-function protocol:
//!
//! - request body: `{"data": <payload>}`
//! - success body: `{"result": <payload>}`
//! - failure body: `{"error": {"status": "<CODE>", "message": "..."}}`
//!
//! The caller identity travels separately, as a Bearer ID token.

use serde::{Deserialize, Serialize};

/// Request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallableRequest<T> {
    pub data: T,
}

impl<T> CallableRequest<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Response envelope: exactly one of `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableResponse<T> {
    Result(T),
    Error(CallableError),
}

impl<T> CallableResponse<T> {
    pub fn into_result(self) -> Result<T, CallableError> {
        match self {
            CallableResponse::Result(value) => Ok(value),
            CallableResponse::Error(err) => Err(err),
        }
    }
}

/// Error payload carried in a failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableError {
    pub status: ErrorCode,
    pub message: String,
}

impl CallableError {
    pub fn new(status: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CallableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status.as_str(), self.message)
    }
}

impl std::error::Error for CallableError {}

/// Fixed vocabulary of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Caller identity does not match the target user.
    PermissionDenied,
    /// Malformed or incorrect input (e.g. a wrong OTP).
    InvalidArgument,
    /// No user record.
    NotFound,
    /// Verification attempted with no outstanding OTP.
    FailedPrecondition,
    /// The outstanding OTP has expired.
    DeadlineExceeded,
    /// Missing or invalid ID token.
    Unauthenticated,
    /// Store failure.
    Internal,
    /// Mail relay failure.
    Unavailable,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::PermissionDenied,
        ErrorCode::InvalidArgument,
        ErrorCode::NotFound,
        ErrorCode::FailedPrecondition,
        ErrorCode::DeadlineExceeded,
        ErrorCode::Unauthenticated,
        ErrorCode::Internal,
        ErrorCode::Unavailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::Unavailable => "UNAVAILABLE",
        }
    }

    /// HTTP status code used when this error is returned over HTTP.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::PermissionDenied => 403,
            ErrorCode::InvalidArgument => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::FailedPrecondition => 400,
            ErrorCode::DeadlineExceeded => 504,
            ErrorCode::Unauthenticated => 401,
            ErrorCode::Internal => 500,
            ErrorCode::Unavailable => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope_wraps_data() {
        let req = CallableRequest::new(serde_json::json!({"uid": "u1"}));
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"data":{"uid":"u1"}}"#);
    }

    #[test]
    fn test_success_envelope_uses_result_key() {
        let resp: CallableResponse<serde_json::Value> =
            CallableResponse::Result(serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"result":{"ok":true}}"#);
    }

    #[test]
    fn test_error_envelope_parses() {
        let json = r#"{"error":{"status":"DEADLINE_EXCEEDED","message":"OTP expired"}}"#;
        let resp: CallableResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.status, ErrorCode::DeadlineExceeded);
        assert_eq!(err.message, "OTP expired");
    }

    #[test]
    fn test_error_code_serializes_as_str() {
        for code in ErrorCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorCode::PermissionDenied.http_status(), 403);
        assert_eq!(ErrorCode::FailedPrecondition.http_status(), 400);
        assert_eq!(ErrorCode::DeadlineExceeded.http_status(), 504);
        assert_eq!(ErrorCode::Unauthenticated.http_status(), 401);
    }

    #[test]
    fn test_callable_error_display() {
        let err = CallableError::new(ErrorCode::InvalidArgument, "Incorrect OTP");
        assert_eq!(err.to_string(), "INVALID_ARGUMENT: Incorrect OTP");
    }
}
