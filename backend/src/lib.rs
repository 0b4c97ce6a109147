pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod models;
pub mod otp;
pub mod routes;
pub mod services;
pub mod store;
pub mod test_util;

pub use auth::{AuthUser, TokenVerifier};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::ApiError;
pub use mail::Mailer;
pub use models::UserRecord;
pub use store::UserStore;

use std::sync::Arc;

use axum::{middleware, Router};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub verifier: TokenVerifier,
    pub store: UserStore,
    /// Outbound mail transport.
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

/// All routes, with request logging.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router(state.clone()))
        .merge(routes::callable::router(state))
        .layer(middleware::from_fn(logging::request_logger))
}
