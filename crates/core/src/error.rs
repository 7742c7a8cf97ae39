//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, not-found kinds). Transport concerns belong to the API layer;
/// datastore failures are wrapped into `Store` and must never leak their
/// message to clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Checkout attempted against a cart with no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// Requested quantity exceeds the book's live stock.
    #[error("insufficient stock for '{0}'")]
    InsufficientStock(String),

    /// Book exists but is inactive (delisted).
    #[error("book not available: {0}")]
    BookUnavailable(String),

    #[error("book not found")]
    BookNotFound,

    #[error("cart not found")]
    CartNotFound,

    /// Cart line not found in the caller's cart.
    #[error("item not found in cart")]
    ItemNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("user not found")]
    UserNotFound,

    /// A value failed validation (e.g. malformed input, illegal transition).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A uniqueness conflict (e.g. duplicate username).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authentication/authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,

    /// Unclassified datastore failure. Logged server-side, never echoed.
    #[error("datastore error: {0}")]
    Store(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient_stock(title: impl Into<String>) -> Self {
        Self::InsufficientStock(title.into())
    }

    pub fn book_unavailable(title: impl Into<String>) -> Self {
        Self::BookUnavailable(title.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// True for the not-found family (mapped to 404 at the API boundary).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BookNotFound
                | Self::CartNotFound
                | Self::ItemNotFound
                | Self::OrderNotFound
                | Self::UserNotFound
        )
    }
}
