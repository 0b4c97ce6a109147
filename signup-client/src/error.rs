//! Error types for the signup client.

use signup_common::{CallableError, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a callable error envelope.
    #[error("{0}")]
    Rejected(CallableError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Identity provider error: {0}")]
    Identity(String),

    /// Input rejected before anything was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Resend available in {remaining_secs}s")]
    Cooldown { remaining_secs: u64 },

    #[error("Not allowed while {0}")]
    InvalidState(&'static str),
}

impl ClientError {
    /// Server error code, when the server rejected the call.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Rejected(err) => Some(err.status),
            _ => None,
        }
    }

    /// Text suitable for showing next to the form.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected(err) => err.message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
