use axum::{
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod customers;
pub mod devices;
pub mod parts;
pub mod system;
pub mod ticket_parts;
pub mod tickets;
pub mod users;

/// Full routing tree. Role checks live in the handlers; the auth middleware
/// only establishes identity.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .nest("/users", users::router())
        .nest("/customers", customers::router())
        .nest("/devices", devices::router())
        .nest("/tickets", tickets::router())
        .nest("/parts", parts::router())
        .nest("/ticket-parts", ticket_parts::router())
}
