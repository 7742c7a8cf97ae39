//! Cart reads and mutations.
//!
//! Every operation returns the refreshed cart view so callers always see
//! totals recomputed from the surviving lines.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use bookmart_cart::{Cart, CartLine, CartView, CartViewLine};
use bookmart_core::{BookId, CartId, CartLineId, DomainError, DomainResult, UserId};

use crate::store::{Datastore, StoreTx};

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Datastore>,
}

impl CartService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// The user's cart, created on first touch.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: UserId) -> DomainResult<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = find_or_create_cart(tx.as_mut(), user_id).await?;
        let view = load_view(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Add a book, merging into an existing line for the same book.
    #[instrument(skip(self), fields(user_id = %user_id, book_id = %book_id))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: i64,
    ) -> DomainResult<CartView> {
        if quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        let mut tx = self.store.begin().await?;
        let cart = find_or_create_cart(tx.as_mut(), user_id).await?;

        let book = tx
            .find_book(book_id)
            .await?
            .ok_or(DomainError::BookNotFound)?;
        if !book.status.is_active() {
            return Err(DomainError::book_unavailable(book.title));
        }

        let merged = match tx.find_cart_line(cart.id, book_id).await? {
            Some(existing) => {
                let new_quantity = existing.quantity + quantity;
                if new_quantity > book.stock_quantity {
                    return Err(DomainError::insufficient_stock(book.title));
                }
                tx.update_cart_line_quantity(existing.id, new_quantity)
                    .await?;
                existing.id
            }
            None => {
                if quantity > book.stock_quantity {
                    return Err(DomainError::insufficient_stock(book.title));
                }
                let line = CartLine::new(CartLineId::new(), cart.id, book_id, quantity, Utc::now())?;
                tx.insert_cart_line(&line).await?;
                line.id
            }
        };
        tracing::debug!(line_id = %merged, "cart line upserted");

        let view = load_view(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Set a line's quantity; zero (or less) removes the line.
    #[instrument(skip(self), fields(user_id = %user_id, line_id = %line_id))]
    pub async fn update_cart_item(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i64,
    ) -> DomainResult<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = tx
            .find_cart_by_user(user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;
        let line = owned_line(tx.as_mut(), cart.id, line_id).await?;

        if quantity <= 0 {
            tx.delete_cart_line(line.id).await?;
        } else {
            let book = tx
                .find_book(line.book_id)
                .await?
                .ok_or(DomainError::BookNotFound)?;
            if quantity > book.stock_quantity {
                return Err(DomainError::insufficient_stock(book.title));
            }
            tx.update_cart_line_quantity(line.id, quantity).await?;
        }

        let view = load_view(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    #[instrument(skip(self), fields(user_id = %user_id, line_id = %line_id))]
    pub async fn remove_cart_item(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> DomainResult<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = tx
            .find_cart_by_user(user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;
        let line = owned_line(tx.as_mut(), cart.id, line_id).await?;
        tx.delete_cart_line(line.id).await?;

        let view = load_view(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: UserId) -> DomainResult<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = tx
            .find_cart_by_user(user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;
        tx.delete_cart_lines(cart.id).await?;

        let view = load_view(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }
}

async fn find_or_create_cart(tx: &mut dyn StoreTx, user_id: UserId) -> DomainResult<Cart> {
    if let Some(cart) = tx.find_cart_by_user(user_id).await? {
        return Ok(cart);
    }
    let cart = Cart::new(CartId::new(), user_id, Utc::now());
    tx.insert_cart(&cart).await?;
    Ok(cart)
}

/// A line is only addressable through its owning user's cart.
async fn owned_line(
    tx: &mut dyn StoreTx,
    cart_id: CartId,
    line_id: CartLineId,
) -> DomainResult<CartLine> {
    match tx.find_cart_line_by_id(line_id).await? {
        Some(line) if line.cart_id == cart_id => Ok(line),
        _ => Err(DomainError::ItemNotFound),
    }
}

async fn load_view(tx: &mut dyn StoreTx, cart: &Cart) -> DomainResult<CartView> {
    let lines = tx.cart_lines(cart.id).await?;
    let mut view_lines = Vec::with_capacity(lines.len());
    for line in lines {
        let book = tx
            .find_book(line.book_id)
            .await?
            .ok_or(DomainError::BookNotFound)?;
        view_lines.push(CartViewLine { line, book });
    }
    Ok(CartView::new(cart.id, view_lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use bookmart_catalog::{Book, BookDraft};
    use bookmart_core::Money;
    use rust_decimal_macros::dec;

    async fn seed_book(store: &InMemoryStore, price: rust_decimal::Decimal, stock: i64) -> BookId {
        let book = Book::create(
            BookId::new(),
            BookDraft {
                isbn: format!("isbn-{}", BookId::new()),
                title: "a book".to_string(),
                author: "an author".to_string(),
                publisher: None,
                price: Money::new(price).unwrap(),
                stock_quantity: stock,
                description: None,
                cover_image: None,
                category_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_book(&book).await.unwrap();
        tx.commit().await.unwrap();
        book.id
    }

    #[tokio::test]
    async fn cart_is_created_on_first_read() {
        let store = Arc::new(InMemoryStore::new());
        let carts = CartService::new(store);
        let view = carts.get_cart(UserId::new()).await.unwrap();
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn adding_same_book_twice_merges_lines() {
        let store = Arc::new(InMemoryStore::new());
        let carts = CartService::new(store.clone());
        let user_id = UserId::new();
        let book_id = seed_book(&store, dec!(12.50), 10).await;

        carts.add_to_cart(user_id, book_id, 2).await.unwrap();
        let view = carts.add_to_cart(user_id, book_id, 3).await.unwrap();

        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.total_items(), 5);
        assert_eq!(view.total_amount().amount(), dec!(62.50));
    }

    #[tokio::test]
    async fn adding_beyond_stock_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let carts = CartService::new(store.clone());
        let user_id = UserId::new();
        let book_id = seed_book(&store, dec!(10), 3).await;

        carts.add_to_cart(user_id, book_id, 2).await.unwrap();
        let err = carts.add_to_cart(user_id, book_id, 2).await.unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock(_)));

        // Rejected add leaves the cart as it was.
        let view = carts.get_cart(user_id).await.unwrap();
        assert_eq!(view.total_items(), 2);
    }

    #[tokio::test]
    async fn quantity_zero_removes_the_line_and_totals_follow() {
        let store = Arc::new(InMemoryStore::new());
        let carts = CartService::new(store.clone());
        let user_id = UserId::new();
        let keep = seed_book(&store, dec!(7.00), 10).await;
        let drop = seed_book(&store, dec!(3.00), 10).await;

        carts.add_to_cart(user_id, keep, 1).await.unwrap();
        let view = carts.add_to_cart(user_id, drop, 2).await.unwrap();
        let drop_line = view
            .lines
            .iter()
            .find(|l| l.book.id == drop)
            .map(|l| l.line.id)
            .unwrap();

        let view = carts.update_cart_item(user_id, drop_line, 0).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.total_amount().amount(), dec!(7.00));
        assert_eq!(view.total_items(), 1);
    }

    #[tokio::test]
    async fn foreign_line_is_not_addressable() {
        let store = Arc::new(InMemoryStore::new());
        let carts = CartService::new(store.clone());
        let alice = UserId::new();
        let bob = UserId::new();
        let book_id = seed_book(&store, dec!(10), 10).await;

        let view = carts.add_to_cart(alice, book_id, 1).await.unwrap();
        let line_id = view.lines[0].line.id;
        carts.get_cart(bob).await.unwrap();

        let err = carts.remove_cart_item(bob, line_id).await.unwrap_err();
        assert_eq!(err, DomainError::ItemNotFound);
    }

    #[tokio::test]
    async fn clear_cart_empties_everything() {
        let store = Arc::new(InMemoryStore::new());
        let carts = CartService::new(store.clone());
        let user_id = UserId::new();
        let b1 = seed_book(&store, dec!(10), 10).await;
        let b2 = seed_book(&store, dec!(5), 10).await;

        carts.add_to_cart(user_id, b1, 1).await.unwrap();
        carts.add_to_cart(user_id, b2, 2).await.unwrap();
        let view = carts.clear_cart(user_id).await.unwrap();
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn inactive_book_cannot_be_added() {
        use bookmart_catalog::{BookPatch, BookStatus};

        let store = Arc::new(InMemoryStore::new());
        let carts = CartService::new(store.clone());
        let book_id = seed_book(&store, dec!(10), 10).await;

        let mut tx = store.begin().await.unwrap();
        let mut book = tx.find_book(book_id).await.unwrap().unwrap();
        book.apply_patch(BookPatch {
            status: Some(BookStatus::Inactive),
            ..BookPatch::default()
        })
        .unwrap();
        tx.update_book(&book).await.unwrap();
        tx.commit().await.unwrap();

        let err = carts
            .add_to_cart(UserId::new(), book_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::BookUnavailable(_)));
    }
}
