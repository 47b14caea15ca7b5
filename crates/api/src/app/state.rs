//! Store selection and shared application state.

use std::sync::Arc;

use fixtrack_auth::Hs256Jwt;
use fixtrack_infra::{InMemoryStore, PostgresStore, Store};

/// Shared state handed to every handler via `Extension<Arc<AppState>>`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt: Arc<Hs256Jwt>,
}

/// Pick the store backend from the environment.
///
/// `DATABASE_URL` set: Postgres. Otherwise an in-memory store, which keeps
/// local development and the black-box tests free of external services.
pub async fn build_store() -> Arc<dyn Store> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await
                .expect("failed to connect to DATABASE_URL");
            tracing::info!("using Postgres store");
            Arc::new(PostgresStore::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    }
}
