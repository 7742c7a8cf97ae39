//! `bookmart-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;
pub mod pagination;

pub use error::{DomainError, DomainResult};
pub use id::{AdminId, BookId, CartId, CartLineId, CategoryId, OrderId, OrderLineId, StockLogId, UserId};
pub use money::Money;
pub use pagination::{PageRequest, Paginated, Pagination};
