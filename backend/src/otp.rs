//! One-time signup codes.
//!
//! Codes are six decimal digits drawn uniformly (leading zeros kept).
//! Only a salted SHA-256 digest of a code is ever persisted; the plain
//! code exists just long enough to be emailed.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use signup_common::OTP_LENGTH;

/// An outstanding verification challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    /// Hex SHA-256 of `salt || code`.
    pub code_hash: String,
    /// Hex-encoded random salt.
    pub salt: String,
    pub expires_at: DateTime<Utc>,
    /// Failed verification attempts against this challenge.
    pub attempts: u32,
}

impl OtpChallenge {
    /// Create a challenge for `code` that expires `ttl` after `now`.
    pub fn new(code: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        let salt = generate_salt();
        Self {
            code_hash: hash_code(&salt, code),
            salt,
            expires_at: now + ttl,
            attempts: 0,
        }
    }

    /// Generate a fresh code and its challenge.
    ///
    /// When a previous challenge is given the new code is guaranteed to
    /// differ from the one it replaces.
    pub fn issue(
        previous: Option<&OtpChallenge>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> (String, Self) {
        let mut code = generate_code();
        if let Some(previous) = previous {
            while previous.matches(&code) {
                code = generate_code();
            }
        }
        let challenge = Self::new(&code, now, ttl);
        (code, challenge)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn matches(&self, code: &str) -> bool {
        hash_code(&self.salt, code)
            .as_bytes()
            .ct_eq(self.code_hash.as_bytes())
            .into()
    }
}

/// Draw a uniformly random fixed-width numeric code.
pub fn generate_code() -> String {
    let upper = 10u32.pow(OTP_LENGTH as u32);
    let value = rand::thread_rng().gen_range(0..upper);
    format!("{:0width$}", value, width = OTP_LENGTH)
}

fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub fn hash_code(salt: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use signup_common::is_well_formed_code;

    #[test]
    fn test_generated_codes_are_well_formed() {
        for _ in 0..1000 {
            let code = generate_code();
            assert!(is_well_formed_code(&code), "bad code {}", code);
        }
    }

    #[test]
    fn test_challenge_matches_only_its_code() {
        let now = Utc::now();
        let challenge = OtpChallenge::new("012345", now, Duration::minutes(15));
        assert!(challenge.matches("012345"));
        assert!(!challenge.matches("012346"));
        assert!(!challenge.matches("12345"));
    }

    #[test]
    fn test_truncated_stored_digest_never_matches() {
        let mut challenge = OtpChallenge::new("012345", Utc::now(), Duration::minutes(15));
        challenge.code_hash.truncate(32);
        assert!(!challenge.matches("012345"));
        challenge.code_hash.clear();
        assert!(!challenge.matches("012345"));
    }

    #[test]
    fn test_challenge_does_not_store_plain_code() {
        let challenge = OtpChallenge::new("424242", Utc::now(), Duration::minutes(15));
        assert!(!challenge.code_hash.contains("424242"));
        assert_eq!(challenge.code_hash.len(), 64);
    }

    #[test]
    fn test_same_code_different_salt() {
        let now = Utc::now();
        let a = OtpChallenge::new("111111", now, Duration::minutes(15));
        let b = OtpChallenge::new("111111", now, Duration::minutes(15));
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.code_hash, b.code_hash);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let challenge = OtpChallenge::new("111111", now, Duration::minutes(15));
        assert!(!challenge.is_expired(now + Duration::minutes(15)));
        assert!(challenge.is_expired(now + Duration::minutes(15) + Duration::seconds(1)));
    }

    #[test]
    fn test_issue_replaces_with_different_code() {
        let now = Utc::now();
        let (first_code, first) = OtpChallenge::issue(None, now, Duration::minutes(15));
        for _ in 0..100 {
            let (code, _) = OtpChallenge::issue(Some(&first), now, Duration::minutes(15));
            assert_ne!(code, first_code);
        }
    }
}
