use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use signup_client::error::Result;
use signup_client::{
    ClientError, FlowState, IdentityProvider, RegistrationForm, Session, SignupApi, SignupFlow,
    RESEND_COOLDOWN,
};
use signup_common::{
    Ack, CallableError, CreateProfileRequest, ErrorCode, ProfileView, VerifiedAck,
};

const CODE: &str = "123456";

/// In-memory stand-in for the callables.
#[derive(Default)]
struct FakeApi {
    inner: Mutex<FakeBackend>,
}

#[derive(Default)]
struct FakeBackend {
    profile: Option<ProfileView>,
    fail_issue: bool,
    fail_login_email: bool,
    calls: Vec<String>,
}

impl FakeApi {
    fn with_profile(profile: ProfileView) -> Self {
        let api = Self::default();
        api.inner.lock().unwrap().profile = Some(profile);
        api
    }

    fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| *call == name).count()
    }

    fn set_fail_issue(&self, fail: bool) {
        self.inner.lock().unwrap().fail_issue = fail;
    }

    fn set_fail_login_email(&self, fail: bool) {
        self.inner.lock().unwrap().fail_login_email = fail;
    }

    fn record(&self, name: &str) {
        self.inner.lock().unwrap().calls.push(name.to_string());
    }
}

fn rejected(status: ErrorCode, message: &str) -> ClientError {
    ClientError::Rejected(CallableError::new(status, message))
}

#[async_trait]
impl SignupApi for FakeApi {
    async fn create_profile(&self, _id_token: &str, request: &CreateProfileRequest) -> Result<Ack> {
        self.record("createProfile");
        self.inner.lock().unwrap().profile = Some(ProfileView {
            uid: request.uid.clone(),
            email: request.email.clone(),
            name: request.name.clone(),
            is_verified: false,
            first_login_at: None,
            last_login_at: None,
        });
        Ok(Ack::ok())
    }

    async fn request_otp(&self, _id_token: &str, _uid: &str) -> Result<Ack> {
        self.record("requestOtp");
        if self.inner.lock().unwrap().fail_issue {
            return Err(rejected(ErrorCode::Unavailable, "Email delivery failed"));
        }
        Ok(Ack::ok())
    }

    async fn verify_otp(&self, _id_token: &str, _uid: &str, code: &str) -> Result<VerifiedAck> {
        self.record("verifyOtp");
        if code != CODE {
            return Err(rejected(ErrorCode::InvalidArgument, "Incorrect OTP"));
        }
        if let Some(profile) = self.inner.lock().unwrap().profile.as_mut() {
            profile.is_verified = true;
        }
        Ok(VerifiedAck::verified())
    }

    async fn send_login_email(&self, _id_token: &str, _uid: &str) -> Result<Ack> {
        self.record("sendLoginEmail");
        if self.inner.lock().unwrap().fail_login_email {
            return Err(rejected(ErrorCode::Unavailable, "Email delivery failed"));
        }
        Ok(Ack::ok())
    }

    async fn get_profile(&self, _id_token: &str, _uid: &str) -> Result<Option<ProfileView>> {
        self.record("getProfile");
        Ok(self.inner.lock().unwrap().profile.clone())
    }
}

struct FakeIdentity {
    email: Option<String>,
    reject: bool,
}

impl FakeIdentity {
    fn ok() -> Self {
        Self {
            email: Some("asha@example.com".to_string()),
            reject: false,
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn create_account(&self, email: &str, _password: &str, display_name: Option<&str>) -> Result<Session> {
        if self.reject {
            return Err(ClientError::Identity("EMAIL_EXISTS".to_string()));
        }
        Ok(Session {
            uid: "user-1".to_string(),
            id_token: "token".to_string(),
            email: Some(email.to_string()),
            display_name: display_name.map(String::from),
        })
    }

    async fn sign_in_with_google(&self, _google_id_token: &str) -> Result<Session> {
        Ok(Session {
            uid: "user-1".to_string(),
            id_token: "token".to_string(),
            email: self.email.clone(),
            display_name: Some("Asha".to_string()),
        })
    }
}

fn form() -> RegistrationForm {
    RegistrationForm {
        name: "Asha".to_string(),
        email: "asha@example.com".to_string(),
        password: "hunter22".to_string(),
        confirm_password: "hunter22".to_string(),
    }
}

fn profile(is_verified: bool) -> ProfileView {
    ProfileView {
        uid: "user-1".to_string(),
        email: "asha@example.com".to_string(),
        name: Some("Asha".to_string()),
        is_verified,
        first_login_at: None,
        last_login_at: None,
    }
}

fn enter(flow: &mut SignupFlow<FakeApi, FakeIdentity>, code: &str) {
    flow.otp_input_mut().input(0, code);
}

#[tokio::test]
async fn test_register_and_verify() {
    let mut flow = SignupFlow::new(FakeApi::default(), FakeIdentity::ok());
    let now = Instant::now();

    flow.register(&form(), now).await.unwrap();
    assert_eq!(flow.state(), FlowState::AwaitingOtp);
    assert_eq!(flow.delivery_error(), None);
    assert_eq!(flow.api().calls(), vec!["createProfile", "requestOtp"]);

    enter(&mut flow, CODE);
    let session = flow.submit_code().await.unwrap();
    assert_eq!(session.uid, "user-1");
    assert_eq!(flow.state(), FlowState::Verified);
    assert_eq!(flow.api().count("sendLoginEmail"), 1);
}

#[tokio::test]
async fn test_password_mismatch_fails_locally() {
    let mut flow = SignupFlow::new(FakeApi::default(), FakeIdentity::ok());
    let mut mismatched = form();
    mismatched.confirm_password = "hunter23".to_string();

    let err = flow.register(&mismatched, Instant::now()).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(flow.state(), FlowState::Idle);
    assert_eq!(flow.error(), Some("Passwords do not match"));
    assert!(flow.api().calls().is_empty());
}

#[tokio::test]
async fn test_identity_failure_fails_flow() {
    let identity = FakeIdentity {
        email: None,
        reject: true,
    };
    let mut flow = SignupFlow::new(FakeApi::default(), identity);

    assert!(flow.register(&form(), Instant::now()).await.is_err());
    assert_eq!(flow.state(), FlowState::Failed);
    assert_eq!(flow.error(), Some("Identity provider error: EMAIL_EXISTS"));
}

#[tokio::test]
async fn test_wrong_code_keeps_digits() {
    let mut flow = SignupFlow::new(FakeApi::default(), FakeIdentity::ok());
    flow.register(&form(), Instant::now()).await.unwrap();

    enter(&mut flow, "654321");
    let err = flow.submit_code().await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidArgument));
    assert_eq!(flow.state(), FlowState::AwaitingOtp);
    assert_eq!(flow.error(), Some("Incorrect OTP"));
    assert_eq!(flow.otp_input().value(), "654321");
    assert_eq!(flow.api().count("sendLoginEmail"), 0);
}

#[tokio::test]
async fn test_incomplete_code_not_submitted() {
    let mut flow = SignupFlow::new(FakeApi::default(), FakeIdentity::ok());
    flow.register(&form(), Instant::now()).await.unwrap();

    enter(&mut flow, "123");
    assert!(matches!(
        flow.submit_code().await,
        Err(ClientError::Validation(_))
    ));
    assert_eq!(flow.api().count("verifyOtp"), 0);
}

#[tokio::test]
async fn test_issuance_failure_is_visible_and_resend_is_immediate() {
    let api = FakeApi::default();
    api.set_fail_issue(true);
    let mut flow = SignupFlow::new(api, FakeIdentity::ok());
    let now = Instant::now();

    flow.register(&form(), now).await.unwrap();
    assert_eq!(flow.state(), FlowState::AwaitingOtp);
    assert_eq!(flow.delivery_error(), Some("Email delivery failed"));
    assert_eq!(flow.resend_remaining(now), None);

    flow.api().set_fail_issue(false);
    flow.resend(now).await.unwrap();
    assert_eq!(flow.delivery_error(), None);
    assert_eq!(flow.resend_remaining(now), Some(RESEND_COOLDOWN));
}

#[tokio::test]
async fn test_resend_cooldown() {
    let mut flow = SignupFlow::new(FakeApi::default(), FakeIdentity::ok());
    let start = Instant::now();
    flow.register(&form(), start).await.unwrap();

    let err = flow.resend(start + Duration::from_secs(10)).await.unwrap_err();
    assert!(matches!(err, ClientError::Cooldown { remaining_secs: 50 }));
    assert_eq!(flow.api().count("requestOtp"), 1);

    enter(&mut flow, "111");
    flow.resend(start + RESEND_COOLDOWN).await.unwrap();
    assert_eq!(flow.api().count("requestOtp"), 2);
    assert_eq!(flow.otp_input().value(), "");
}

#[tokio::test]
async fn test_login_email_failure_does_not_block_verification() {
    let mut flow = SignupFlow::new(FakeApi::default(), FakeIdentity::ok());
    flow.register(&form(), Instant::now()).await.unwrap();
    flow.api().set_fail_login_email(true);

    enter(&mut flow, CODE);
    assert!(flow.submit_code().await.is_ok());
    assert_eq!(flow.state(), FlowState::Verified);
}

#[tokio::test]
async fn test_submit_outside_otp_entry() {
    let mut flow = SignupFlow::new(FakeApi::default(), FakeIdentity::ok());
    assert!(matches!(
        flow.submit_code().await,
        Err(ClientError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_google_verified_user_logs_in_immediately() {
    let mut flow = SignupFlow::new(FakeApi::with_profile(profile(true)), FakeIdentity::ok());

    let state = flow.sign_in_with_google("google-token", Instant::now()).await.unwrap();
    assert_eq!(state, FlowState::Verified);
    assert_eq!(flow.api().calls(), vec!["getProfile", "sendLoginEmail"]);
}

#[tokio::test]
async fn test_google_unverified_user_gets_code() {
    let mut flow = SignupFlow::new(FakeApi::with_profile(profile(false)), FakeIdentity::ok());

    let state = flow.sign_in_with_google("google-token", Instant::now()).await.unwrap();
    assert_eq!(state, FlowState::AwaitingOtp);
    assert_eq!(flow.api().calls(), vec!["getProfile", "requestOtp"]);
}

#[tokio::test]
async fn test_google_new_user_creates_profile() {
    let mut flow = SignupFlow::new(FakeApi::default(), FakeIdentity::ok());

    let state = flow.sign_in_with_google("google-token", Instant::now()).await.unwrap();
    assert_eq!(state, FlowState::AwaitingOtp);
    assert_eq!(
        flow.api().calls(),
        vec!["getProfile", "createProfile", "requestOtp"]
    );

    enter(&mut flow, CODE);
    flow.submit_code().await.unwrap();
    assert_eq!(flow.state(), FlowState::Verified);
}

#[tokio::test]
async fn test_google_new_user_without_email() {
    let identity = FakeIdentity {
        email: None,
        reject: false,
    };
    let mut flow = SignupFlow::new(FakeApi::default(), identity);

    assert!(flow.sign_in_with_google("google-token", Instant::now()).await.is_err());
    assert_eq!(flow.state(), FlowState::Failed);
}
