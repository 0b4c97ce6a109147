use signup_common::{Ack, CreateProfileRequest, ProfileView};

use super::{ensure_caller, not_found};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::UserRecord;
use crate::AppState;

/// Write the initial profile for a newly created account.
///
/// Merges into an existing record: the name is replaced, and so is the
/// email while the record is unverified. A verified email stays put.
/// Verification state and login bookkeeping are left alone.
pub async fn create_profile(
    state: &AppState,
    caller: &AuthUser,
    request: &CreateProfileRequest,
) -> Result<Ack, ApiError> {
    ensure_caller(caller, &request.uid)?;

    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::InvalidArgument("Invalid email".to_string()));
    }
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let now = state.clock.now();
    state.store.update(&request.uid, |slot| -> Result<(), ApiError> {
        match slot.as_mut() {
            Some(record) => {
                if !record.is_verified {
                    record.email = email.to_string();
                } else if record.email != email {
                    tracing::warn!(uid = %request.uid, "Ignoring email change on verified record");
                }
                if let Some(name) = name {
                    record.name = Some(name.to_string());
                }
            }
            None => {
                *slot = Some(UserRecord::new(&request.uid, email, name, now));
                tracing::info!(uid = %request.uid, "Created user profile");
            }
        }
        Ok(())
    })?;

    Ok(Ack::ok())
}

pub async fn get_profile(
    state: &AppState,
    caller: &AuthUser,
    uid: &str,
) -> Result<ProfileView, ApiError> {
    ensure_caller(caller, uid)?;
    let record = state.store.get(uid)?.ok_or_else(not_found)?;
    Ok(record.to_view())
}
