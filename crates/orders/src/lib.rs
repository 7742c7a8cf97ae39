//! `bookmart-orders` — orders and the checkout core.

pub mod checkout;
pub mod order;

pub use checkout::{checkout_total, validate_cart_for_checkout};
pub use order::{Order, OrderLine, OrderStatus, OrderWithLines};
