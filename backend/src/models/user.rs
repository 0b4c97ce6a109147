use chrono::{DateTime, Utc};
use signup_common::ProfileView;

use crate::otp::OtpChallenge;

/// Per-user record, keyed by the identity provider's user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// User ID from the identity provider (sub claim)
    pub id: String,
    /// Mail destination
    pub email: String,
    /// Display name
    pub name: Option<String>,
    /// Set only by a successful OTP verification
    pub is_verified: bool,
    /// Outstanding verification challenge, if any
    pub otp: Option<OtpChallenge>,
    /// Whether the next qualifying login also gets an "account created" email
    pub send_account_created_next_login: bool,
    /// First login observed while verified; written once
    pub first_login_at: Option<DateTime<Utc>>,
    /// Most recent login notification
    pub last_login_at: Option<DateTime<Utc>>,
    /// When verification succeeded
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(id: &str, email: &str, name: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            name: name.map(String::from),
            is_verified: false,
            otp: None,
            send_account_created_next_login: false,
            first_login_at: None,
            last_login_at: None,
            verified_at: None,
            created_at: now,
        }
    }

    /// A login counts as the first one only once the account is verified.
    pub fn is_first_login(&self) -> bool {
        self.first_login_at.is_none() && self.is_verified
    }

    /// Name used in greetings, falling back to the mailbox's local part.
    pub fn greeting_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }

    pub fn to_view(&self) -> ProfileView {
        ProfileView {
            uid: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            is_verified: self.is_verified,
            first_login_at: self.first_login_at,
            last_login_at: self.last_login_at,
        }
    }
}
