//! The checkout transaction: cart → order, atomically.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use bookmart_cart::CartViewLine;
use bookmart_core::{DomainError, DomainResult, OrderId, OrderLineId, StockLogId, UserId};
use bookmart_inventory::StockLog;
use bookmart_orders::{
    Order, OrderLine, OrderWithLines, checkout_total, validate_cart_for_checkout,
};

use crate::store::Datastore;

/// Converts a user's cart into an order.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Datastore>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Run the whole checkout in one transaction.
    ///
    /// Locks every book in the cart, validates each line against the locked
    /// stock, then writes the order, the order lines, the stock decrements,
    /// the sale rows of the stock ledger and the cart cleanup together. Any
    /// failing line aborts everything; no partial effect is ever visible.
    #[instrument(skip(self, shipping_address), fields(user_id = %user_id))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        shipping_address: String,
    ) -> DomainResult<OrderWithLines> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let cart = tx
            .find_cart_by_user(user_id)
            .await?
            .ok_or(DomainError::CartNotFound)?;
        let cart_lines = tx.cart_lines(cart.id).await?;
        if cart_lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let book_ids: Vec<_> = cart_lines.iter().map(|l| l.book_id).collect();
        let locked: HashMap<_, _> = tx
            .lock_books(&book_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let mut lines = Vec::with_capacity(cart_lines.len());
        for line in cart_lines {
            let book = locked
                .get(&line.book_id)
                .cloned()
                .ok_or(DomainError::BookNotFound)?;
            lines.push(CartViewLine { line, book });
        }

        if let Err(err) = validate_cart_for_checkout(&lines) {
            tracing::warn!(user_id = %user_id, %err, "checkout rejected");
            return Err(err);
        }
        let total = checkout_total(&lines);

        let order = Order::new(OrderId::new(), user_id, total, shipping_address, now)?;
        tx.insert_order(&order).await?;

        let mut order_lines = Vec::with_capacity(lines.len());
        for view in &lines {
            let order_line = OrderLine {
                id: OrderLineId::new(),
                order_id: order.id,
                book_id: view.book.id,
                book_title: view.book.title.clone(),
                quantity: view.line.quantity,
                unit_price: view.book.price,
            };
            tx.insert_order_line(&order_line).await?;
            order_lines.push(order_line);

            let mut book = view.book.clone();
            let before = book.stock_quantity;
            book.stock_quantity -= view.line.quantity;
            book.sales_count += view.line.quantity;
            tx.update_book(&book).await?;

            let log = StockLog::sale(
                StockLogId::new(),
                book.id,
                before,
                view.line.quantity,
                order.id,
                now,
            );
            tx.append_stock_log(&log).await?;
        }

        tx.delete_cart_lines(cart.id).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, total = %order.total_amount, "order created");
        Ok(OrderWithLines {
            order,
            lines: order_lines,
        })
    }
}
