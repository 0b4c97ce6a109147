//! Callable operations.
//!
//! Each operation checks the caller against the target uid, then does its
//! read-check-write inside a single [`UserStore::update`] call.
//!
//! [`UserStore::update`]: crate::store::UserStore::update

mod login;
mod profile;
mod signup;

pub use login::notify_login;
pub use profile::{create_profile, get_profile};
pub use signup::{request_otp, verify_otp};

use chrono::{DateTime, Utc};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::UserRecord;

/// Callers may only act on their own record.
fn ensure_caller(caller: &AuthUser, uid: &str) -> Result<(), ApiError> {
    if caller.is(uid) {
        Ok(())
    } else {
        tracing::warn!(caller = %caller.uid, target = %uid, "Caller does not own target record");
        Err(ApiError::PermissionDenied(
            "Cannot act on another user's record".to_string(),
        ))
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// The stored record, or one created from the caller's token profile.
///
/// Without a stored record the token's email claim is the only mail
/// destination available; no email means there is nobody to write to.
fn record_or_profile<'a>(
    slot: &'a mut Option<UserRecord>,
    caller: &AuthUser,
    now: DateTime<Utc>,
) -> Result<&'a mut UserRecord, ApiError> {
    if slot.is_none() {
        let email = caller
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(not_found)?;
        tracing::info!(uid = %caller.uid, "Creating user record from token profile");
        *slot = Some(UserRecord::new(&caller.uid, email, caller.name.as_deref(), now));
    }
    slot.as_mut().ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(email: Option<&str>) -> AuthUser {
        AuthUser {
            uid: "u1".to_string(),
            email: email.map(String::from),
            name: Some("Asha".to_string()),
        }
    }

    #[test]
    fn test_ensure_caller() {
        assert!(ensure_caller(&caller(None), "u1").is_ok());
        assert!(matches!(
            ensure_caller(&caller(None), "u2"),
            Err(ApiError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_record_created_from_token_profile() {
        let mut slot = None;
        let record = record_or_profile(&mut slot, &caller(Some("a@example.com")), Utc::now()).unwrap();
        assert_eq!(record.email, "a@example.com");
        assert_eq!(record.name.as_deref(), Some("Asha"));
        assert!(slot.is_some());
    }

    #[test]
    fn test_existing_record_wins_over_token() {
        let now = Utc::now();
        let mut slot = Some(UserRecord::new("u1", "stored@example.com", None, now));
        let record = record_or_profile(&mut slot, &caller(Some("token@example.com")), now).unwrap();
        assert_eq!(record.email, "stored@example.com");
    }

    #[test]
    fn test_no_record_and_no_email_is_not_found() {
        let mut slot = None;
        let result = record_or_profile(&mut slot, &caller(Some("  ")), Utc::now());
        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert!(slot.is_none());
    }
}
