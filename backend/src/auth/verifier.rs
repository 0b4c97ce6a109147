use std::collections::HashMap;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::AuthConfig;

/// Caller identity extracted from a validated ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// User id (sub claim)
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthUser {
    /// Whether this caller is acting on their own record.
    pub fn is(&self, uid: &str) -> bool {
        self.uid == uid
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidFormat,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("JWKS fetch error: {0}")]
    JwksFetchError(String),
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),
}

#[derive(Debug, Deserialize)]
struct OidcConfig {
    jwks_uri: String,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

/// ID token claims.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

enum KeySource {
    /// RS256 keys published by the issuer, cached by kid.
    Jwks {
        http_client: Client,
        jwks_uri: String,
        keys: RwLock<HashMap<String, DecodingKey>>,
    },
    /// HS256 shared secret.
    Shared(DecodingKey),
}

/// Validates Bearer ID tokens.
pub struct TokenVerifier {
    source: KeySource,
    issuer: Option<String>,
    audience: Option<String>,
}

impl TokenVerifier {
    pub async fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        if let Some(secret) = &config.jwt_secret {
            tracing::info!("Validating ID tokens with shared secret (HS256)");
            return Ok(Self::with_secret(
                secret,
                config.issuer.as_deref(),
                config.audience.as_deref(),
            ));
        }
        let issuer = config
            .issuer
            .as_deref()
            .ok_or_else(|| AuthError::JwksFetchError("no issuer configured".to_string()))?;
        Self::discover(issuer, config.audience.as_deref()).await
    }

    pub fn with_secret(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        Self {
            source: KeySource::Shared(DecodingKey::from_secret(secret.as_bytes())),
            issuer: issuer.map(String::from),
            audience: audience.map(String::from),
        }
    }

    /// Fetch the issuer's OIDC configuration and its current key set.
    pub async fn discover(issuer: &str, audience: Option<&str>) -> Result<Self, AuthError> {
        let http_client = Client::new();

        let config_url = format!(
            "{}/.well-known/openid-configuration",
            issuer.trim_end_matches('/')
        );
        let config: OidcConfig = http_client
            .get(&config_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let verifier = Self {
            source: KeySource::Jwks {
                http_client,
                jwks_uri: config.jwks_uri,
                keys: RwLock::new(HashMap::new()),
            },
            issuer: Some(issuer.to_string()),
            audience: audience.map(String::from),
        };

        verifier.refresh_keys().await?;
        Ok(verifier)
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        let KeySource::Jwks {
            http_client,
            jwks_uri,
            keys,
        } = &self.source
        else {
            return Ok(());
        };

        tracing::info!("Fetching JWKS from {}", jwks_uri);

        let response: JwksResponse = http_client
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let mut fresh = HashMap::new();
        for jwk in response.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            if let (Some(n), Some(e)) = (&jwk.n, &jwk.e) {
                match DecodingKey::from_rsa_components(n, e) {
                    Ok(key) => {
                        fresh.insert(jwk.kid.clone(), key);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse RSA key {}: {}", jwk.kid, e);
                    }
                }
            }
        }

        tracing::info!("Loaded {} JWKS keys", fresh.len());
        *keys.write().await = fresh;
        Ok(())
    }

    /// Key for a token; unknown kids trigger one JWKS refresh (key rotation).
    async fn key_for(&self, token: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        match &self.source {
            KeySource::Shared(key) => Ok((key.clone(), Algorithm::HS256)),
            KeySource::Jwks { keys, .. } => {
                let header =
                    decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
                let kid = header
                    .kid
                    .ok_or_else(|| AuthError::InvalidToken("Missing kid in token header".to_string()))?;

                if let Some(key) = keys.read().await.get(&kid) {
                    return Ok((key.clone(), Algorithm::RS256));
                }

                self.refresh_keys().await?;
                keys.read()
                    .await
                    .get(&kid)
                    .map(|key| (key.clone(), Algorithm::RS256))
                    .ok_or(AuthError::KeyNotFound(kid))
            }
        }
    }

    /// Authenticate a request by validating its Bearer token.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = bearer_token(headers)?;
        self.verify(token).await
    }

    pub async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let (key, algorithm) = self.key_for(token).await?;

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(AuthUser {
            uid: token_data.claims.sub,
            email: token_data.claims.email,
            name: token_data.claims.name,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}
