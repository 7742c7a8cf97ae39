//! Order read side for the storefront.

use std::sync::Arc;

use tracing::instrument;

use bookmart_core::{DomainError, DomainResult, OrderId, PageRequest, Paginated, UserId};
use bookmart_orders::OrderWithLines;

use crate::store::Datastore;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Datastore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// A user's order history, newest first, each order with its lines.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user_orders(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> DomainResult<Paginated<OrderWithLines>> {
        let mut tx = self.store.begin().await?;
        let (orders, total) = tx.list_user_orders(user_id, page).await?;
        let mut with_lines = Vec::with_capacity(orders.len());
        for order in orders {
            let lines = tx.order_lines(order.id).await?;
            with_lines.push(OrderWithLines { order, lines });
        }
        Ok(Paginated::new(with_lines, total, page))
    }

    /// One order with its lines. With `requester` set, orders belonging to
    /// anyone else read as not found rather than forbidden.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        order_id: OrderId,
        requester: Option<UserId>,
    ) -> DomainResult<OrderWithLines> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .filter(|o| requester.is_none_or(|u| o.user_id == u))
            .ok_or(DomainError::OrderNotFound)?;
        let lines = tx.order_lines(order.id).await?;
        Ok(OrderWithLines { order, lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cart::CartService;
    use crate::services::checkout::CheckoutService;
    use crate::store::{Datastore, InMemoryStore};
    use bookmart_cart::Cart;
    use bookmart_catalog::{Book, BookDraft};
    use bookmart_core::{BookId, CartId, Money};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    async fn place_order(store: &Arc<InMemoryStore>, user_id: UserId) -> OrderId {
        let mut tx = store.begin().await.unwrap();
        if tx.find_cart_by_user(user_id).await.unwrap().is_none() {
            tx.insert_cart(&Cart::new(CartId::new(), user_id, Utc::now()))
                .await
                .unwrap();
        }
        let book = Book::create(
            BookId::new(),
            BookDraft {
                isbn: format!("isbn-{}", BookId::new()),
                title: "a book".to_string(),
                author: "an author".to_string(),
                publisher: None,
                price: Money::new(dec!(15)).unwrap(),
                stock_quantity: 10,
                description: None,
                cover_image: None,
                category_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        tx.insert_book(&book).await.unwrap();
        tx.commit().await.unwrap();

        CartService::new(store.clone())
            .add_to_cart(user_id, book.id, 1)
            .await
            .unwrap();
        CheckoutService::new(store.clone())
            .checkout(user_id, "42 Main St".to_string())
            .await
            .unwrap()
            .order
            .id
    }

    #[tokio::test]
    async fn history_is_paginated_with_lines() {
        let store = Arc::new(InMemoryStore::new());
        let orders = OrderService::new(store.clone());
        let user_id = UserId::new();
        for _ in 0..3 {
            place_order(&store, user_id).await;
        }

        let page = orders
            .get_user_orders(user_id, PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].lines.len(), 1);
    }

    #[tokio::test]
    async fn ownership_filter_hides_foreign_orders() {
        let store = Arc::new(InMemoryStore::new());
        let orders = OrderService::new(store.clone());
        let alice = UserId::new();
        let bob = UserId::new();
        let order_id = place_order(&store, alice).await;

        assert!(orders.get_order(order_id, Some(alice)).await.is_ok());
        assert_eq!(
            orders.get_order(order_id, Some(bob)).await.unwrap_err(),
            DomainError::OrderNotFound
        );
        // Admin-style read without a requester sees everything.
        assert!(orders.get_order(order_id, None).await.is_ok());
    }
}
