use signup_common::{is_well_formed_code, Ack, VerifiedAck};

use super::{ensure_caller, not_found, record_or_profile};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::mail::{templates, EmailKind, OutgoingEmail};
use crate::otp::OtpChallenge;
use crate::AppState;

/// Issue a fresh code for `uid` and email it.
///
/// The new challenge replaces any outstanding one, so only the most
/// recently issued code can verify. The code itself is never returned.
pub async fn request_otp(state: &AppState, caller: &AuthUser, uid: &str) -> Result<Ack, ApiError> {
    ensure_caller(caller, uid)?;

    let now = state.clock.now();
    let ttl = state.config.otp.ttl();

    let (code, email) = state.store.update(uid, |slot| -> Result<_, ApiError> {
        let record = record_or_profile(slot, caller, now)?;
        let (code, challenge) = OtpChallenge::issue(record.otp.as_ref(), now, ttl);
        record.otp = Some(challenge);
        record.is_verified = false;
        record.send_account_created_next_login = true;
        Ok((code, record.email.clone()))
    })?;

    tracing::info!(uid = %uid, "Issued signup OTP");

    let rendered = templates::render(
        &state.config.mail.product_name,
        &EmailKind::Otp {
            code,
            ttl_minutes: state.config.otp.ttl_minutes,
        },
    );
    state
        .mailer
        .send(&OutgoingEmail::new(&email, rendered))
        .await?;

    Ok(Ack::ok())
}

/// Check `code` against the outstanding challenge for `uid`.
///
/// Every mismatch counts against the challenge; once the configured
/// number of attempts is used up the challenge is discarded and a new
/// code must be requested.
pub async fn verify_otp(
    state: &AppState,
    caller: &AuthUser,
    uid: &str,
    code: &str,
) -> Result<VerifiedAck, ApiError> {
    if !is_well_formed_code(code) {
        return Err(ApiError::InvalidArgument("Invalid OTP".to_string()));
    }
    ensure_caller(caller, uid)?;

    let now = state.clock.now();
    let max_attempts = state.config.otp.max_attempts;

    state.store.update(uid, |slot| -> Result<VerifiedAck, ApiError> {
        let record = slot.as_mut().ok_or_else(not_found)?;
        let challenge = record
            .otp
            .as_mut()
            .ok_or_else(|| ApiError::FailedPrecondition("No OTP requested".to_string()))?;

        if challenge.is_expired(now) {
            tracing::info!(uid = %uid, "OTP expired");
            return Err(ApiError::DeadlineExceeded("OTP expired".to_string()));
        }

        if !challenge.matches(code) {
            challenge.attempts += 1;
            let attempts = challenge.attempts;
            if attempts >= max_attempts {
                tracing::warn!(uid = %uid, attempts, "Too many incorrect OTP attempts, discarding code");
                record.otp = None;
            } else {
                tracing::info!(uid = %uid, attempts, "Incorrect OTP");
            }
            return Err(ApiError::InvalidArgument("Incorrect OTP".to_string()));
        }

        record.otp = None;
        record.is_verified = true;
        record.verified_at = Some(now);
        tracing::info!(uid = %uid, "User verified");
        Ok(VerifiedAck::verified())
    })
}
