//! Pure checkout validation over a locked cart snapshot.
//!
//! The transactional workflow (in `bookmart-infra`) loads the cart and locks
//! the affected book rows, then calls into these functions so the pass/fail
//! decision and the total are computed from one consistent snapshot. If any
//! line fails, the caller aborts the whole transaction — partial application
//! is never observable.

use bookmart_cart::CartViewLine;
use bookmart_core::{DomainError, Money};

/// Validate every cart line against the live (locked) book rows.
///
/// Fails with `EmptyCart` for a cart with no lines, `BookUnavailable` for an
/// inactive book, and `InsufficientStock` where the requested quantity
/// exceeds live stock. The first failing line wins; the caller discards all
/// work either way.
pub fn validate_cart_for_checkout(lines: &[CartViewLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::EmptyCart);
    }
    for l in lines {
        if !l.book.status.is_active() {
            return Err(DomainError::book_unavailable(l.book.title.clone()));
        }
        if l.line.quantity > l.book.stock_quantity {
            return Err(DomainError::insufficient_stock(l.book.title.clone()));
        }
    }
    Ok(())
}

/// Exact decimal order total: Σ price × quantity over the snapshot.
pub fn checkout_total(lines: &[CartViewLine]) -> Money {
    lines.iter().map(CartViewLine::line_total).sum()
}
