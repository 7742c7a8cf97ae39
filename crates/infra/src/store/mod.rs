//! Relational datastore seam.
//!
//! `Datastore::begin()` opens a transaction; every read and write inside the
//! checkout and stock-adjustment workflows goes through the resulting
//! [`StoreTx`] so the backend can give all-or-nothing semantics. Dropping a
//! transaction without `commit()` rolls it back on both backends.

pub mod in_memory;
pub mod postgres;
pub mod records;
#[allow(clippy::module_inception)]
mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::{
    DashboardStats, OperationLog, OperationLogFilter, OrderListFilter, UserListFilter,
};
pub use r#trait::{Datastore, StoreTx};

use thiserror::Error;

use bookmart_core::DomainError;

/// Backend-level failure. Mapped into `DomainError` at the service boundary;
/// the raw message is for server-side logs only.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-constraint style conflict (duplicate username/email/isbn).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything else the backend reports (connectivity, serialization, ...).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::Backend(msg) => DomainError::Store(msg),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // 23505: unique_violation
            if db.code().as_deref() == Some("23505") {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Backend(err.to_string())
    }
}
