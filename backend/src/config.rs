//! Configuration for the signup service.

use chrono::{Duration, FixedOffset};
use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// ID token validation.
///
/// Exactly one key source is used: JWKS discovered from `issuer`
/// (RS256), or `jwt_secret` (HS256) when no JWKS issuer is reachable,
/// e.g. in local development.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// OIDC issuer URL. Also checked against the `iss` claim.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Shared HS256 secret. Takes precedence over JWKS discovery.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Expected `aud` claim. Not checked when unset.
    #[serde(default)]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    #[default]
    Smtp,
    /// Print messages to the log instead of sending them.
    Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub transport: MailTransport,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Sender mailbox, e.g. `ExamPrep <no-reply@example.com>`.
    #[serde(default = "default_from")]
    pub from: String,
    /// Product name used in subjects and bodies.
    #[serde(default = "default_product_name")]
    pub product_name: String,
    /// SMTP command timeout.
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::default(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from: default_from(),
            product_name: default_product_name(),
            timeout_secs: default_mail_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Lifetime of an issued code.
    #[serde(default = "default_otp_ttl")]
    pub ttl_minutes: i64,
    /// Failed attempts after which the outstanding code is discarded.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl OtpConfig {
    pub fn ttl(&self) -> Duration {
        Duration::minutes(self.ttl_minutes)
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_otp_ttl(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Timezone used for human-readable timestamps in emails.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_zone_label")]
    pub zone_label: String,
}

impl DisplayConfig {
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset(),
            zone_label: default_zone_label(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated allowed origins, or `*`.
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_database_url() -> String {
    "sqlite:./data/users.db".to_string()
}
fn default_smtp_host() -> String {
    "localhost".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_from() -> String {
    "ExamPrep <no-reply@example.com>".to_string()
}
fn default_product_name() -> String {
    "ExamPrep".to_string()
}
fn default_mail_timeout() -> u64 {
    10
}
fn default_otp_ttl() -> i64 {
    15
}
fn default_max_attempts() -> u32 {
    5
}
fn default_utc_offset() -> i32 {
    330
}
fn default_zone_label() -> String {
    "IST".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (SIGNUP__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigLoadError> {
        let loader = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("SIGNUP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = loader.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.auth.issuer.is_none() && self.auth.jwt_secret.is_none() {
            return Err(ConfigLoadError::Invalid(
                "auth.issuer or auth.jwt_secret must be set".to_string(),
            ));
        }
        if self.otp.ttl_minutes <= 0 {
            return Err(ConfigLoadError::Invalid(
                "otp.ttl_minutes must be positive".to_string(),
            ));
        }
        if self.otp.max_attempts == 0 {
            return Err(ConfigLoadError::Invalid(
                "otp.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.display.offset().is_none() {
            return Err(ConfigLoadError::Invalid(format!(
                "display.utc_offset_minutes out of range: {}",
                self.display.utc_offset_minutes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Config {
        Config {
            server: ServerConfig::default(),
            auth: AuthConfig {
                issuer: None,
                jwt_secret: Some("secret".to_string()),
                audience: None,
            },
            database: DatabaseConfig::default(),
            mail: MailConfig::default(),
            otp: OtpConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
            cors: CorsConfig::default(),
        }
    }

    #[test]
    fn test_default_server_config() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);
    }

    #[test]
    fn test_default_otp_config() {
        let otp = OtpConfig::default();
        assert_eq!(otp.ttl(), Duration::minutes(15));
        assert_eq!(otp.max_attempts, 5);
    }

    #[test]
    fn test_default_display_offset_is_ist() {
        let offset = DisplayConfig::default().offset().unwrap();
        assert_eq!(offset.local_minus_utc(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn test_validate_accepts_minimal() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_key_source() {
        let mut config = minimal();
        config.auth.jwt_secret = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = minimal();
        config.otp.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_offset() {
        let mut config = minimal();
        config.display.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mail_transport_parses_lowercase() {
        let transport: MailTransport = serde_json::from_str(r#""log""#).unwrap();
        assert_eq!(transport, MailTransport::Log);
    }
}
