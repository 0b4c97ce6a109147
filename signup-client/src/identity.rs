//! Account creation and sign-in against the identity provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    /// Bearer token for the callables.
    pub id_token: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account and sign in as it.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Session>;

    /// Exchange a Google ID token for a session.
    async fn sign_in_with_google(&self, google_id_token: &str) -> Result<Session>;
}

/// Identity Toolkit REST client (`accounts:signUp`, `accounts:signInWithIdp`).
pub struct IdentityToolkitProvider {
    http_client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    id_token: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityToolkitProvider {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(DEFAULT_IDENTITY_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post<T: Serialize + Sync>(&self, method: &str, body: &T) -> Result<AuthResponse> {
        let url = format!("{}/v1/accounts:{}", self.base_url, method);
        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            tracing::warn!("Identity provider rejected {}: {}", method, message);
            return Err(ClientError::Identity(message));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::InvalidResponse(format!("accounts:{}: {}", method, e)))
    }
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Self {
            uid: response.local_id,
            id_token: response.id_token,
            email: response.email,
            display_name: response.display_name,
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Session> {
        let request = SignUpRequest {
            email,
            password,
            display_name,
            return_secure_token: true,
        };
        let mut session = Session::from(self.post("signUp", &request).await?);
        if session.display_name.is_none() {
            session.display_name = display_name.map(String::from);
        }
        tracing::info!("Created account {}", session.uid);
        Ok(session)
    }

    async fn sign_in_with_google(&self, google_id_token: &str) -> Result<Session> {
        let request = SignInWithIdpRequest {
            post_body: url::form_urlencoded::Serializer::new(String::new())
                .append_pair("id_token", google_id_token)
                .append_pair("providerId", "google.com")
                .finish(),
            request_uri: "http://localhost",
            return_secure_token: true,
        };
        let session = Session::from(self.post("signInWithIdp", &request).await?);
        tracing::info!("Signed in with Google as {}", session.uid);
        Ok(session)
    }
}
