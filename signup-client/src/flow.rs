//! Signup and verification state machine.
//!
//! ```text
//! Idle -> Registering -> AwaitingOtp -> Verifying -> Verified
//!              |              ^              |
//!              v              +--------------+ (wrong/expired code)
//!            Failed
//! ```
//!
//! Every transition takes `&mut self`, so a second submission cannot
//! start while one is still in flight.

use std::time::{Duration, Instant};

use signup_common::{CreateProfileRequest, OTP_LENGTH};

use crate::api::SignupApi;
use crate::error::{ClientError, Result};
use crate::identity::{IdentityProvider, Session};
use crate::otp_input::OtpInput;

/// Minimum time between two resend requests.
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Registering,
    AwaitingOtp,
    Verifying,
    Verified,
    Failed,
}

impl FlowState {
    fn describe(self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Registering => "registering",
            FlowState::AwaitingOtp => "awaiting a code",
            FlowState::Verifying => "verifying",
            FlowState::Verified => "verified",
            FlowState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Checks that need no server round trip.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(ClientError::Validation("Email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(ClientError::Validation("Password is required".to_string()));
        }
        if self.password != self.confirm_password {
            return Err(ClientError::Validation("Passwords do not match".to_string()));
        }
        Ok(())
    }

    fn display_name(&self) -> Option<&str> {
        Some(self.name.trim()).filter(|name| !name.is_empty())
    }
}

pub struct SignupFlow<A, I> {
    api: A,
    identity: I,
    state: FlowState,
    session: Option<Session>,
    otp: OtpInput,
    /// Inline error for the current screen.
    error: Option<String>,
    /// Set when the last code could not be sent.
    delivery_error: Option<String>,
    resend_available_at: Option<Instant>,
}

impl<A: SignupApi, I: IdentityProvider> SignupFlow<A, I> {
    pub fn new(api: A, identity: I) -> Self {
        Self {
            api,
            identity,
            state: FlowState::Idle,
            session: None,
            otp: OtpInput::new(),
            error: None,
            delivery_error: None,
            resend_available_at: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn delivery_error(&self) -> Option<&str> {
        self.delivery_error.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn otp_input(&self) -> &OtpInput {
        &self.otp
    }

    pub fn otp_input_mut(&mut self) -> &mut OtpInput {
        &mut self.otp
    }

    /// Time left before resend is allowed; `None` when it is allowed now.
    pub fn resend_remaining(&self, now: Instant) -> Option<Duration> {
        self.resend_available_at
            .and_then(|at| at.checked_duration_since(now))
            .filter(|left| !left.is_zero())
    }

    /// Create the account, write its profile and request the first code.
    pub async fn register(&mut self, form: &RegistrationForm, now: Instant) -> Result<()> {
        self.expect_state(&[FlowState::Idle, FlowState::Failed])?;
        self.error = None;

        if let Err(err) = form.validate() {
            self.error = Some(err.user_message());
            return Err(err);
        }

        self.state = FlowState::Registering;
        let email = form.email.trim();

        let created = self
            .identity
            .create_account(email, &form.password, form.display_name())
            .await;
        let session = match created {
            Ok(session) => session,
            Err(err) => return Err(self.fail(err)),
        };

        let profile = CreateProfileRequest {
            uid: session.uid.clone(),
            email: email.to_string(),
            name: form.display_name().map(String::from),
        };
        if let Err(err) = self.api.create_profile(&session.id_token, &profile).await {
            return Err(self.fail(err));
        }

        self.session = Some(session);
        self.await_otp(now).await;
        Ok(())
    }

    /// Sign in with Google. Verified users are logged in straight away;
    /// everyone else goes through OTP verification.
    pub async fn sign_in_with_google(&mut self, google_id_token: &str, now: Instant) -> Result<FlowState> {
        self.expect_state(&[FlowState::Idle, FlowState::Failed])?;
        self.error = None;
        self.state = FlowState::Registering;

        let signed_in = self.identity.sign_in_with_google(google_id_token).await;
        let session = match signed_in {
            Ok(session) => session,
            Err(err) => return Err(self.fail(err)),
        };

        let fetched = self.api.get_profile(&session.id_token, &session.uid).await;
        let profile = match fetched {
            Ok(profile) => profile,
            Err(err) => return Err(self.fail(err)),
        };

        match profile {
            Some(profile) if profile.is_verified => {
                self.session = Some(session);
                self.complete_login().await;
            }
            Some(_) => {
                self.session = Some(session);
                self.await_otp(now).await;
            }
            None => {
                let Some(email) = session.email.clone() else {
                    let err = ClientError::Validation("Google account has no email".to_string());
                    return Err(self.fail(err));
                };
                let request = CreateProfileRequest {
                    uid: session.uid.clone(),
                    email,
                    name: session.display_name.clone(),
                };
                if let Err(err) = self.api.create_profile(&session.id_token, &request).await {
                    return Err(self.fail(err));
                }
                self.session = Some(session);
                self.await_otp(now).await;
            }
        }

        Ok(self.state)
    }

    /// Submit the entered code.
    ///
    /// A rejected code leaves the digits in place and returns to
    /// `AwaitingOtp` with an inline message.
    pub async fn submit_code(&mut self) -> Result<Session> {
        self.expect_state(&[FlowState::AwaitingOtp])?;
        let session = self.current_session()?;

        let Some(code) = self.otp.code() else {
            let err = ClientError::Validation(format!("Enter the {}-digit code", OTP_LENGTH));
            self.error = Some(err.user_message());
            return Err(err);
        };

        self.state = FlowState::Verifying;
        self.error = None;

        if let Err(err) = self.api.verify_otp(&session.id_token, &session.uid, &code).await {
            tracing::info!("Verification rejected: {}", err);
            self.error = Some(err.user_message());
            self.state = FlowState::AwaitingOtp;
            return Err(err);
        }

        self.complete_login().await;
        Ok(session)
    }

    /// Ask for a new code. Clears the entered digits on success.
    pub async fn resend(&mut self, now: Instant) -> Result<()> {
        self.expect_state(&[FlowState::AwaitingOtp])?;
        if let Some(left) = self.resend_remaining(now) {
            return Err(ClientError::Cooldown {
                remaining_secs: left.as_secs().max(1),
            });
        }

        let session = self.current_session()?;
        self.error = None;
        match self.api.request_otp(&session.id_token, &session.uid).await {
            Ok(_) => {
                self.otp.clear();
                self.delivery_error = None;
                self.resend_available_at = Some(now + RESEND_COOLDOWN);
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Resend failed: {}", err);
                self.delivery_error = Some(err.user_message());
                self.resend_available_at = None;
                Err(err)
            }
        }
    }

    /// Request a code and move to OTP entry, whatever the outcome.
    /// A failed send is reported through [`Self::delivery_error`] and
    /// leaves resend available immediately.
    async fn await_otp(&mut self, now: Instant) {
        self.otp.clear();
        if let Some(session) = self.session.as_ref() {
            match self.api.request_otp(&session.id_token, &session.uid).await {
                Ok(_) => {
                    self.delivery_error = None;
                    self.resend_available_at = Some(now + RESEND_COOLDOWN);
                }
                Err(err) => {
                    tracing::warn!("Could not send verification code: {}", err);
                    self.delivery_error = Some(err.user_message());
                    self.resend_available_at = None;
                }
            }
        }
        self.state = FlowState::AwaitingOtp;
    }

    /// A missing login email does not undo the login.
    async fn complete_login(&mut self) {
        if let Some(session) = self.session.as_ref() {
            if let Err(err) = self.api.send_login_email(&session.id_token, &session.uid).await {
                tracing::warn!("Login email failed: {}", err);
            }
        }
        self.state = FlowState::Verified;
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        tracing::warn!("Signup failed: {}", err);
        self.error = Some(err.user_message());
        self.state = FlowState::Failed;
        err
    }

    fn current_session(&self) -> Result<Session> {
        self.session
            .clone()
            .ok_or(ClientError::InvalidState("signed out"))
    }

    fn expect_state(&self, allowed: &[FlowState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ClientError::InvalidState(self.state.describe()))
        }
    }
}
