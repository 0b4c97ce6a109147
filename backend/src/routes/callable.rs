//! `POST /v1/<name>` handlers for the callable operations.
//!
//! Every handler authenticates the Bearer token before looking at the
//! body, then unwraps the `{"data": ...}` envelope and answers with
//! `{"result": ...}`. Failures are rendered by [`ApiError`].

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use signup_common::{
    Ack, CallableRequest, CallableResponse, CreateProfileRequest, ProfileView, UidRequest,
    VerifiedAck, VerifyOtpRequest, CREATE_PROFILE, GET_PROFILE, REQUEST_SIGNUP_OTP,
    SEND_LOGIN_EMAIL, VERIFY_SIGNUP_OTP,
};

use crate::error::ApiError;
use crate::services;
use crate::AppState;

type CallableResult<T> = Result<Json<CallableResponse<T>>, ApiError>;

fn respond<T: Serialize>(value: T) -> CallableResult<T> {
    Ok(Json(CallableResponse::Result(value)))
}

fn unwrap_payload<T>(payload: Result<Json<CallableRequest<T>>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(request)| request.data)
        .map_err(|e| ApiError::InvalidArgument(format!("Malformed request: {}", e.body_text())))
}

async fn request_signup_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CallableRequest<UidRequest>>, JsonRejection>,
) -> CallableResult<Ack> {
    let caller = state.verifier.authenticate(&headers).await?;
    let request = unwrap_payload(payload)?;
    respond(services::request_otp(&state, &caller, &request.uid).await?)
}

async fn verify_signup_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CallableRequest<VerifyOtpRequest>>, JsonRejection>,
) -> CallableResult<VerifiedAck> {
    let caller = state.verifier.authenticate(&headers).await?;
    let request = unwrap_payload(payload)?;
    respond(services::verify_otp(&state, &caller, &request.uid, &request.code).await?)
}

async fn send_login_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CallableRequest<UidRequest>>, JsonRejection>,
) -> CallableResult<Ack> {
    let caller = state.verifier.authenticate(&headers).await?;
    let request = unwrap_payload(payload)?;
    respond(services::notify_login(&state, &caller, &request.uid).await?)
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CallableRequest<CreateProfileRequest>>, JsonRejection>,
) -> CallableResult<Ack> {
    let caller = state.verifier.authenticate(&headers).await?;
    let request = unwrap_payload(payload)?;
    respond(services::create_profile(&state, &caller, &request).await?)
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CallableRequest<UidRequest>>, JsonRejection>,
) -> CallableResult<ProfileView> {
    let caller = state.verifier.authenticate(&headers).await?;
    let request = unwrap_payload(payload)?;
    respond(services::get_profile(&state, &caller, &request.uid).await?)
}

fn path(name: &str) -> String {
    format!("/v1/{}", name)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&path(REQUEST_SIGNUP_OTP), post(request_signup_otp))
        .route(&path(VERIFY_SIGNUP_OTP), post(verify_signup_otp))
        .route(&path(SEND_LOGIN_EMAIL), post(send_login_email))
        .route(&path(CREATE_PROFILE), post(create_profile))
        .route(&path(GET_PROFILE), post(get_profile))
        .with_state(state)
}
