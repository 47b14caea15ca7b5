//! HTTP API application wiring (Axum router + store wiring).
//!
//! Layout:
//! - `state.rs`: store selection and shared application state
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod state;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Every route runs through the auth middleware; it lets the small public
/// allowlist (health, login, customer self-registration) pass token-free.
pub async fn build_app(jwt_secret: String) -> Router {
    let jwt = Arc::new(fixtrack_auth::Hs256Jwt::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt: jwt.clone() };

    let app_state = Arc::new(state::AppState {
        store: state::build_store().await,
        jwt,
    });

    routes::router()
        .layer(Extension(app_state))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .layer(ServiceBuilder::new())
}
