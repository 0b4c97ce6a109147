//! Signup Common Types
//!
//! Shared types used by both the signup backend and the signup client.

pub mod callable;
pub mod otp;
pub mod signup;

pub use callable::{CallableError, CallableRequest, CallableResponse, ErrorCode};
pub use otp::{is_well_formed_code, OTP_LENGTH};
pub use signup::{
    Ack, CreateProfileRequest, ProfileView, UidRequest, VerifiedAck, VerifyOtpRequest,
    CREATE_PROFILE, GET_PROFILE, REQUEST_SIGNUP_OTP, SEND_LOGIN_EMAIL, VERIFY_SIGNUP_OTP,
};
