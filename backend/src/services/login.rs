use chrono::{DateTime, Offset, Utc};
use signup_common::Ack;

use super::{ensure_caller, not_found};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::mail::templates::{self, format_local_time};
use crate::mail::{EmailKind, MailError, OutgoingEmail};
use crate::store::StoreError;
use crate::AppState;

/// What one login took from the record, and what it found there.
struct LoginClaim {
    email: String,
    name: String,
    /// This call stamped `first_login_at`.
    first_login: bool,
    send_account_created: bool,
    account_created_flag: bool,
    previous_last_login: Option<DateTime<Utc>>,
}

/// Send login notifications and record the login.
///
/// The first login of a verified account also gets the "account created"
/// email when issuance flagged it. The first login is claimed inside the
/// store transaction before any mail goes out, so overlapping calls send
/// that email at most once. A relay failure releases the claim and the
/// next login tries again.
pub async fn notify_login(state: &AppState, caller: &AuthUser, uid: &str) -> Result<Ack, ApiError> {
    ensure_caller(caller, uid)?;

    let now = state.clock.now();
    let claim = state.store.update(uid, |slot| -> Result<LoginClaim, ApiError> {
        let record = slot.as_mut().ok_or_else(not_found)?;
        let first_login = record.is_first_login();
        let claim = LoginClaim {
            email: record.email.clone(),
            name: record.greeting_name().to_string(),
            first_login,
            send_account_created: first_login && record.send_account_created_next_login,
            account_created_flag: record.send_account_created_next_login,
            previous_last_login: record.last_login_at,
        };
        if first_login {
            record.first_login_at = Some(now);
            record.send_account_created_next_login = false;
        }
        record.last_login_at = Some(now);
        Ok(claim)
    })?;

    if let Err(e) = send_login_emails(state, &claim, now).await {
        release_claim(state, uid, &claim, now);
        return Err(e.into());
    }

    if claim.first_login {
        tracing::info!(uid = %uid, "Recorded first login");
    }
    Ok(Ack::ok())
}

async fn send_login_emails(
    state: &AppState,
    claim: &LoginClaim,
    now: DateTime<Utc>,
) -> Result<(), MailError> {
    let product = &state.config.mail.product_name;

    if claim.send_account_created {
        let rendered = templates::render(
            product,
            &EmailKind::AccountCreated {
                name: claim.name.clone(),
            },
        );
        state
            .mailer
            .send(&OutgoingEmail::new(&claim.email, rendered))
            .await?;
        tracing::info!(to = %claim.email, "Sent account created email");
    }

    let display = &state.config.display;
    let offset = display.offset().unwrap_or_else(|| Utc.fix());
    let rendered = templates::render(
        product,
        &EmailKind::LoginSuccessful {
            name: claim.name.clone(),
            local_time: format_local_time(now, offset, &display.zone_label),
        },
    );
    state
        .mailer
        .send(&OutgoingEmail::new(&claim.email, rendered))
        .await
}

/// Undo this call's bookkeeping, leaving later logins' writes alone.
fn release_claim(state: &AppState, uid: &str, claim: &LoginClaim, now: DateTime<Utc>) {
    let released = state.store.update(uid, |slot| -> Result<(), StoreError> {
        let Some(record) = slot.as_mut() else {
            return Ok(());
        };
        if claim.first_login && record.first_login_at == Some(now) {
            record.first_login_at = None;
            record.send_account_created_next_login = claim.account_created_flag;
        }
        if record.last_login_at == Some(now) {
            record.last_login_at = claim.previous_last_login;
        }
        Ok(())
    });

    if let Err(e) = released {
        tracing::error!(uid = %uid, "Failed to release login claim: {}", e);
    }
}
