//! Transactional application services.
//!
//! Each service holds an `Arc<dyn Datastore>` and opens one transaction per
//! operation. Domain rules live in the domain crates; the services sequence
//! loads, locks, validations and writes inside a single transaction so every
//! operation is all-or-nothing.

pub mod admin;
pub mod books;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod users;

pub use admin::{AdminActor, AdminService, StockAdjustment};
pub use books::{BookDetails, BookService};
pub use cart::CartService;
pub use checkout::CheckoutService;
pub use orders::OrderService;
pub use users::{RegisterUser, UserService};
