//! Fixtures shared by unit and integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use crate::clock::Clock;
use crate::config::{
    AuthConfig, Config, CorsConfig, DatabaseConfig, DisplayConfig, LoggingConfig, MailConfig,
    MailTransport, OtpConfig, ServerConfig,
};
use crate::mail::{MailError, Mailer, OutgoingEmail};
use crate::store::UserStore;
use crate::{AppState, TokenVerifier};

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_ISSUER: &str = "https://test-issuer";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        auth: AuthConfig {
            issuer: Some(TEST_ISSUER.to_string()),
            jwt_secret: Some(TEST_SECRET.to_string()),
            audience: None,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        mail: MailConfig {
            transport: MailTransport::Log,
            ..MailConfig::default()
        },
        otp: OtpConfig::default(),
        display: DisplayConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig::default(),
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Mailer that keeps every message, optionally failing or stalling on demand.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: AtomicBool,
    delay: Mutex<Option<StdDuration>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Hold every send for `delay` before it completes.
    pub fn set_delay(&self, delay: StdDuration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|email| email.subject).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Code from the most recent OTP email.
    pub fn last_otp_code(&self) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|email| email.subject.ends_with("Your OTP"))
            .and_then(|email| find_code(&email.html))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn transport(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("relay unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// First run of exactly six digits.
fn find_code(html: &str) -> Option<String> {
    html.split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 6)
        .map(String::from)
}

/// Application state wired to in-memory fakes.
pub struct TestContext {
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
}

pub fn create_test_state() -> TestContext {
    create_test_state_with(test_config())
}

pub fn create_test_state_with(config: Config) -> TestContext {
    let mailer = Arc::new(RecordingMailer::new());
    let clock = Arc::new(ManualClock::new(test_now()));
    let verifier = TokenVerifier::with_secret(TEST_SECRET, Some(TEST_ISSUER), None);
    let store = UserStore::open(&config.database.url).unwrap();

    let state = Arc::new(AppState {
        config,
        verifier,
        store,
        mailer: mailer.clone(),
        clock: clock.clone(),
    });

    TestContext {
        state,
        mailer,
        clock,
    }
}

/// Fixed start time for tests: 17 Oct 2026 09:34 UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 9, 34, 0).unwrap()
}

#[derive(serde::Serialize)]
struct TestClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    iss: String,
    exp: u64,
    iat: u64,
}

/// HS256 ID token for `user_id`, signed with [`TEST_SECRET`].
///
/// Token lifetimes use the wall clock, not the test clock.
pub fn generate_test_jwt(user_id: &str, email: Option<&str>, name: Option<&str>) -> String {
    sign(user_id, email, name, Utc::now() + Duration::hours(1))
}

pub fn generate_expired_jwt(user_id: &str) -> String {
    sign(user_id, None, None, Utc::now() - Duration::hours(1))
}

fn sign(user_id: &str, email: Option<&str>, name: Option<&str>, exp: DateTime<Utc>) -> String {
    let claims = TestClaims {
        sub: user_id.to_string(),
        email: email.map(String::from),
        name: name.map(String::from),
        iss: TEST_ISSUER.to_string(),
        exp: exp.timestamp() as u64,
        iat: (exp - Duration::hours(2)).timestamp() as u64,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("Failed to encode JWT")
}
