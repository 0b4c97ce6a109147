//! Callable operations as seen from the client.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use signup_common::{
    Ack, CallableRequest, CallableResponse, CreateProfileRequest, ErrorCode, ProfileView,
    UidRequest, VerifiedAck, VerifyOtpRequest, CREATE_PROFILE, GET_PROFILE, REQUEST_SIGNUP_OTP,
    SEND_LOGIN_EMAIL, VERIFY_SIGNUP_OTP,
};

use crate::error::{ClientError, Result};

/// Server operations used by the signup flow.
///
/// Every call carries the caller's ID token.
#[async_trait]
pub trait SignupApi: Send + Sync {
    async fn create_profile(&self, id_token: &str, request: &CreateProfileRequest) -> Result<Ack>;

    async fn request_otp(&self, id_token: &str, uid: &str) -> Result<Ack>;

    async fn verify_otp(&self, id_token: &str, uid: &str, code: &str) -> Result<VerifiedAck>;

    async fn send_login_email(&self, id_token: &str, uid: &str) -> Result<Ack>;

    /// `None` when the user has no record yet.
    async fn get_profile(&self, id_token: &str, uid: &str) -> Result<Option<ProfileView>>;
}

/// [`SignupApi`] over HTTP callables (`POST {base_url}/v1/<name>`).
pub struct HttpSignupApi {
    http_client: Client,
    base_url: String,
}

impl HttpSignupApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn call<Req, Res>(&self, name: &str, id_token: &str, data: Req) -> Result<Res>
    where
        Req: Serialize + Send,
        Res: DeserializeOwned,
    {
        let url = format!("{}/v1/{}", self.base_url, name);
        tracing::debug!("Calling {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(id_token)
            .json(&CallableRequest::new(data))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        let envelope: CallableResponse<Res> = serde_json::from_slice(&body).map_err(|e| {
            ClientError::InvalidResponse(format!("{} returned HTTP {}: {}", name, status, e))
        })?;

        envelope.into_result().map_err(|err| {
            tracing::debug!("{} rejected: {}", name, err);
            ClientError::Rejected(err)
        })
    }
}

#[async_trait]
impl SignupApi for HttpSignupApi {
    async fn create_profile(&self, id_token: &str, request: &CreateProfileRequest) -> Result<Ack> {
        self.call(CREATE_PROFILE, id_token, request).await
    }

    async fn request_otp(&self, id_token: &str, uid: &str) -> Result<Ack> {
        self.call(REQUEST_SIGNUP_OTP, id_token, UidRequest::new(uid))
            .await
    }

    async fn verify_otp(&self, id_token: &str, uid: &str, code: &str) -> Result<VerifiedAck> {
        let request = VerifyOtpRequest {
            uid: uid.to_string(),
            code: code.to_string(),
        };
        self.call(VERIFY_SIGNUP_OTP, id_token, request).await
    }

    async fn send_login_email(&self, id_token: &str, uid: &str) -> Result<Ack> {
        self.call(SEND_LOGIN_EMAIL, id_token, UidRequest::new(uid))
            .await
    }

    async fn get_profile(&self, id_token: &str, uid: &str) -> Result<Option<ProfileView>> {
        match self.call(GET_PROFILE, id_token, UidRequest::new(uid)).await {
            Ok(profile) => Ok(Some(profile)),
            Err(err) if err.code() == Some(ErrorCode::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
