use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookmart_catalog::Book;
use bookmart_core::{BookId, CartId, CartLineId, DomainError, Money, UserId};

/// One cart per user. Lines are cleared (never the cart itself) on checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(id: CartId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            created_at: now,
        }
    }
}

/// One (book, quantity) pair in a cart. (cart_id, book_id) is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub book_id: BookId,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn new(
        id: CartLineId,
        cart_id: CartId,
        book_id: BookId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        Ok(Self {
            id,
            cart_id,
            book_id,
            quantity,
            added_at: now,
        })
    }
}

/// A cart line joined with its live book, for display and checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartViewLine {
    pub line: CartLine,
    pub book: Book,
}

impl CartViewLine {
    pub fn line_total(&self) -> Money {
        self.book.price.times(self.line.quantity)
    }
}

/// Materialized cart snapshot. Totals are always derived from the lines —
/// nothing is stored redundantly, so cached and true totals cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub id: CartId,
    pub lines: Vec<CartViewLine>,
}

impl CartView {
    /// Lines are expected in recency order (most recently added first).
    pub fn new(id: CartId, lines: Vec<CartViewLine>) -> Self {
        Self { id, lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_amount(&self) -> Money {
        self.lines.iter().map(CartViewLine::line_total).sum()
    }

    pub fn total_items(&self) -> i64 {
        self.lines.iter().map(|l| l.line.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookmart_catalog::BookDraft;
    use rust_decimal_macros::dec;

    fn view_line(cart_id: CartId, price: rust_decimal::Decimal, quantity: i64) -> CartViewLine {
        let book = Book::create(
            BookId::new(),
            BookDraft {
                isbn: "1".to_string(),
                title: "t".to_string(),
                author: "a".to_string(),
                publisher: None,
                price: Money::new(price).unwrap(),
                stock_quantity: 100,
                description: None,
                cover_image: None,
                category_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        let line = CartLine::new(CartLineId::new(), cart_id, book.id, quantity, Utc::now()).unwrap();
        CartViewLine { line, book }
    }

    #[test]
    fn line_quantity_must_be_positive() {
        let err = CartLine::new(CartLineId::new(), CartId::new(), BookId::new(), 0, Utc::now());
        assert!(err.is_err());
    }

    #[test]
    fn totals_are_derived_from_lines() {
        let cart_id = CartId::new();
        let view = CartView::new(
            cart_id,
            vec![
                view_line(cart_id, dec!(19.99), 2),
                view_line(cart_id, dec!(0.10), 3),
            ],
        );
        assert_eq!(view.total_amount().amount(), dec!(40.28));
        assert_eq!(view.total_items(), 5);
    }

    #[test]
    fn empty_cart_has_zero_totals() {
        let view = CartView::new(CartId::new(), vec![]);
        assert!(view.is_empty());
        assert_eq!(view.total_amount(), Money::ZERO);
        assert_eq!(view.total_items(), 0);
    }
}
