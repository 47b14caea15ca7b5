//! `fixtrack-infra` — storage for the repair-shop backend.
//!
//! One `Store` abstraction, two implementations: an in-memory store for
//! dev/test wiring and a Postgres store for production. The inventory
//! ledger's attach/detach transactions live behind the same trait so the
//! HTTP layer never knows which backend it is talking to.

pub mod store;

#[cfg(test)]
mod integration_tests;

pub use store::{Entity, InMemoryStore, PostgresStore, Store, StoreError, StoreResult};
