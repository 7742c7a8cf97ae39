//! `bookmart-cart` — shopping cart model.

pub mod cart;

pub use cart::{Cart, CartLine, CartView, CartViewLine};
