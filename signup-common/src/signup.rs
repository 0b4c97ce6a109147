//! Payloads of the signup callables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue a fresh OTP for a user and email it.
pub const REQUEST_SIGNUP_OTP: &str = "requestSignupOtpV1";
/// Check a user-supplied OTP.
pub const VERIFY_SIGNUP_OTP: &str = "verifySignupOtpV1";
/// Record a login and send the login (and possibly account-created) email.
pub const SEND_LOGIN_EMAIL: &str = "sendLoginEmailV1";
/// Write the initial profile after identity creation.
pub const CREATE_PROFILE: &str = "createProfileV1";
/// Read the public part of a profile.
pub const GET_PROFILE: &str = "getProfileV1";

/// Payload carrying only the target user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidRequest {
    pub uid: String,
}

impl UidRequest {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub uid: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProfileRequest {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `{ ok: true }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// `{ ok: true, verified: true }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedAck {
    pub ok: bool,
    pub verified: bool,
}

impl VerifiedAck {
    pub fn verified() -> Self {
        Self {
            ok: true,
            verified: true,
        }
    }
}

/// Public view of a user record. Never carries OTP material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub is_verified: bool,
    #[serde(default)]
    pub first_login_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_view_uses_camel_case() {
        let view = ProfileView {
            uid: "u1".to_string(),
            email: "a@example.com".to_string(),
            name: None,
            is_verified: true,
            first_login_at: None,
            last_login_at: None,
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains(r#""isVerified":true"#));
        assert!(json.contains(r#""firstLoginAt":null"#));
    }

    #[test]
    fn test_create_profile_name_optional() {
        let req: CreateProfileRequest =
            serde_json::from_str(r#"{"uid":"u1","email":"a@example.com"}"#).unwrap();
        assert!(req.name.is_none());
    }

    #[test]
    fn test_verified_ack_shape() {
        let json = serde_json::to_string(&VerifiedAck::verified()).unwrap();
        assert_eq!(json, r#"{"ok":true,"verified":true}"#);
    }
}
