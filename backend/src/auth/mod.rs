mod verifier;

pub use verifier::{AuthError, AuthUser, TokenVerifier};
