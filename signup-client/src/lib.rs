//! Client side of the signup verification handshake.
//!
//! [`SignupFlow`] drives registration, OTP entry, verification and the
//! login notification against a [`SignupApi`] and an
//! [`IdentityProvider`]. [`HttpSignupApi`] and [`IdentityToolkitProvider`]
//! are the network implementations of those seams.

pub mod api;
pub mod error;
pub mod flow;
pub mod identity;
pub mod otp_input;

pub use api::{HttpSignupApi, SignupApi};
pub use error::ClientError;
pub use flow::{FlowState, RegistrationForm, SignupFlow, RESEND_COOLDOWN};
pub use identity::{IdentityProvider, IdentityToolkitProvider, Session};
pub use otp_input::OtpInput;
