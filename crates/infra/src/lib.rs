//! `bookmart-infra` — datastore implementations and transactional services.
//!
//! The domain crates are pure; everything that touches a datastore lives
//! here. `store` defines the transactional seam (one trait, two backends:
//! in-memory for dev/test, Postgres for production) and `services` holds the
//! workflows the API exposes, including the checkout transaction.

pub mod services;
pub mod store;

pub use store::{Datastore, InMemoryStore, PostgresStore, StoreError, StoreTx};
