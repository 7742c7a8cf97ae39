//! In-memory datastore.
//!
//! Intended for tests/dev. Transactions take the single table lock for their
//! whole lifetime and mutate a shadow copy, so they are fully serialized:
//! stricter than Postgres row locking, but it gives the same observable
//! guarantee the checkout needs (no two transactions interleave between
//! stock validation and stock decrement).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};

use bookmart_auth::{Admin, User};
use bookmart_cart::{Cart, CartLine};
use bookmart_catalog::{Book, BookSearchParams, Category};
use bookmart_core::{AdminId, BookId, CartId, CartLineId, OrderId, PageRequest, UserId};
use bookmart_inventory::StockLog;
use bookmart_orders::{Order, OrderLine, OrderStatus};

use super::records::{OperationLog, OperationLogFilter, OrderListFilter, UserListFilter};
use super::r#trait::{Datastore, StoreTx};
use super::StoreError;

#[derive(Debug, Default, Clone)]
struct Tables {
    users: HashMap<UserId, User>,
    admins: HashMap<String, Admin>,
    categories: HashMap<String, Category>,
    books: HashMap<BookId, Book>,
    carts: HashMap<CartId, Cart>,
    cart_lines: HashMap<CartLineId, CartLine>,
    orders: HashMap<OrderId, Order>,
    order_lines: Vec<OrderLine>,
    stock_logs: Vec<StockLog>,
    operation_logs: Vec<OperationLog>,
}

/// In-memory implementation of [`Datastore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for InMemoryStore {
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTx + 'a>, StoreError> {
        let guard = self.tables.lock().await;
        let shadow = guard.clone();
        Ok(Box::new(InMemoryTx { guard, shadow }))
    }
}

/// One open transaction: reads and writes go to the shadow copy; `commit`
/// publishes it. Dropping the transaction discards the shadow (rollback).
struct InMemoryTx<'a> {
    guard: MutexGuard<'a, Tables>,
    shadow: Tables,
}

fn paginate<T>(mut items: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let start = page.offset().min(items.len());
    let end = (start + page.limit()).min(items.len());
    items.drain(..start);
    items.truncate(end - start);
    (items, total)
}

#[async_trait]
impl StoreTx for InMemoryTx<'_> {
    // ── users ────────────────────────────────────────────────────────────

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        let duplicate = self
            .shadow
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if duplicate {
            return Err(StoreError::Conflict("username or email already taken".to_string()));
        }
        self.shadow.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.shadow.users.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .shadow
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_username_or_email(
        &mut self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .shadow
            .users
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.shadow.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn list_users(
        &mut self,
        filter: &UserListFilter,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), StoreError> {
        let mut users: Vec<User> = self
            .shadow
            .users
            .values()
            .filter(|u| {
                if let Some(keyword) = &filter.keyword {
                    let kw = keyword.to_lowercase();
                    let hit = u.username.to_lowercase().contains(&kw)
                        || u.email.to_lowercase().contains(&kw)
                        || u.full_name.to_lowercase().contains(&kw);
                    if !hit {
                        return false;
                    }
                }
                if let Some(active_only) = filter.active_only {
                    if active_only != u.status.is_active() {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(users, page))
    }

    async fn count_users(&mut self) -> Result<u64, StoreError> {
        Ok(self.shadow.users.len() as u64)
    }

    // ── admins ───────────────────────────────────────────────────────────

    async fn insert_admin(&mut self, admin: &Admin) -> Result<(), StoreError> {
        if self.shadow.admins.contains_key(&admin.username) {
            return Err(StoreError::Conflict("admin username already taken".to_string()));
        }
        self.shadow.admins.insert(admin.username.clone(), admin.clone());
        Ok(())
    }

    async fn find_admin(&mut self, id: AdminId) -> Result<Option<Admin>, StoreError> {
        Ok(self
            .shadow
            .admins
            .values()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_admin_by_username(&mut self, username: &str) -> Result<Option<Admin>, StoreError> {
        Ok(self.shadow.admins.get(username).cloned())
    }

    async fn update_admin(&mut self, admin: &Admin) -> Result<(), StoreError> {
        self.shadow.admins.insert(admin.username.clone(), admin.clone());
        Ok(())
    }

    async fn list_admins(&mut self, page: PageRequest) -> Result<(Vec<Admin>, u64), StoreError> {
        let mut admins: Vec<Admin> = self.shadow.admins.values().cloned().collect();
        admins.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(paginate(admins, page))
    }

    // ── catalog ──────────────────────────────────────────────────────────

    async fn insert_category(&mut self, category: &Category) -> Result<(), StoreError> {
        self.shadow
            .categories
            .insert(category.name.clone(), category.clone());
        Ok(())
    }

    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> = self.shadow.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_book(&mut self, book: &Book) -> Result<(), StoreError> {
        self.shadow.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn find_book(&mut self, id: BookId) -> Result<Option<Book>, StoreError> {
        Ok(self.shadow.books.get(&id).cloned())
    }

    async fn lock_books(&mut self, ids: &[BookId]) -> Result<Vec<Book>, StoreError> {
        // The table lock is already held for the whole transaction; this is
        // just the snapshot read.
        let mut ids = ids.to_vec();
        ids.sort_by_key(|id| *id.as_uuid());
        ids.dedup();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.shadow.books.get(&id).cloned())
            .collect())
    }

    async fn update_book(&mut self, book: &Book) -> Result<(), StoreError> {
        self.shadow.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn delete_book(&mut self, id: BookId) -> Result<bool, StoreError> {
        Ok(self.shadow.books.remove(&id).is_some())
    }

    async fn search_books(
        &mut self,
        params: &BookSearchParams,
        include_inactive: bool,
        page: PageRequest,
    ) -> Result<(Vec<Book>, u64), StoreError> {
        let mut books: Vec<Book> = self
            .shadow
            .books
            .values()
            .filter(|b| (include_inactive || b.status.is_active()) && params.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(paginate(books, page))
    }

    async fn featured_books(&mut self, limit: usize) -> Result<Vec<Book>, StoreError> {
        let mut books: Vec<Book> = self
            .shadow
            .books
            .values()
            .filter(|b| b.status.is_active())
            .cloned()
            .collect();
        books.sort_by(|a, b| b.sales_count.cmp(&a.sales_count));
        books.truncate(limit);
        Ok(books)
    }

    async fn count_books(&mut self) -> Result<u64, StoreError> {
        Ok(self.shadow.books.len() as u64)
    }

    async fn count_low_stock(&mut self, threshold: i64) -> Result<u64, StoreError> {
        Ok(self
            .shadow
            .books
            .values()
            .filter(|b| b.stock_quantity < threshold)
            .count() as u64)
    }

    // ── carts ────────────────────────────────────────────────────────────

    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), StoreError> {
        self.shadow.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn find_cart_by_user(&mut self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        Ok(self
            .shadow
            .carts
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, StoreError> {
        let mut lines: Vec<CartLine> = self
            .shadow
            .cart_lines
            .values()
            .filter(|l| l.cart_id == cart_id)
            .cloned()
            .collect();
        lines.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(lines)
    }

    async fn find_cart_line(
        &mut self,
        cart_id: CartId,
        book_id: BookId,
    ) -> Result<Option<CartLine>, StoreError> {
        Ok(self
            .shadow
            .cart_lines
            .values()
            .find(|l| l.cart_id == cart_id && l.book_id == book_id)
            .cloned())
    }

    async fn find_cart_line_by_id(
        &mut self,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError> {
        Ok(self.shadow.cart_lines.get(&line_id).cloned())
    }

    async fn insert_cart_line(&mut self, line: &CartLine) -> Result<(), StoreError> {
        self.shadow.cart_lines.insert(line.id, line.clone());
        Ok(())
    }

    async fn update_cart_line_quantity(
        &mut self,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        if let Some(line) = self.shadow.cart_lines.get_mut(&line_id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_line(&mut self, line_id: CartLineId) -> Result<(), StoreError> {
        self.shadow.cart_lines.remove(&line_id);
        Ok(())
    }

    async fn delete_cart_lines(&mut self, cart_id: CartId) -> Result<(), StoreError> {
        self.shadow.cart_lines.retain(|_, l| l.cart_id != cart_id);
        Ok(())
    }

    // ── orders ───────────────────────────────────────────────────────────

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.shadow.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<(), StoreError> {
        self.shadow.order_lines.push(line.clone());
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.shadow.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        // The table mutex already serializes whole transactions.
        Ok(self.shadow.orders.get(&id).cloned())
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError> {
        Ok(self
            .shadow
            .order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.shadow.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn list_user_orders(
        &mut self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), StoreError> {
        let mut orders: Vec<Order> = self
            .shadow
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(paginate(orders, page))
    }

    async fn list_orders(
        &mut self,
        filter: &OrderListFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), StoreError> {
        let mut orders: Vec<Order> = self
            .shadow
            .orders
            .values()
            .filter(|o| {
                if let Some(status) = filter.status {
                    if o.status != status {
                        return false;
                    }
                }
                if let Some(user_id) = filter.user_id {
                    if o.user_id != user_id {
                        return false;
                    }
                }
                if let Some(from) = filter.from {
                    if o.order_date < from {
                        return false;
                    }
                }
                if let Some(to) = filter.to {
                    if o.order_date > to {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(paginate(orders, page))
    }

    async fn count_orders(&mut self) -> Result<u64, StoreError> {
        Ok(self.shadow.orders.len() as u64)
    }

    async fn count_orders_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self
            .shadow
            .orders
            .values()
            .filter(|o| o.order_date >= since)
            .count() as u64)
    }

    async fn count_orders_with_status(&mut self, status: OrderStatus) -> Result<u64, StoreError> {
        Ok(self
            .shadow
            .orders
            .values()
            .filter(|o| o.status == status)
            .count() as u64)
    }

    async fn revenue_since(
        &mut self,
        since: DateTime<Utc>,
        statuses: &[OrderStatus],
    ) -> Result<Decimal, StoreError> {
        Ok(self
            .shadow
            .orders
            .values()
            .filter(|o| o.order_date >= since && statuses.contains(&o.status))
            .map(|o| o.total_amount.amount())
            .sum())
    }

    // ── audit ────────────────────────────────────────────────────────────

    async fn append_stock_log(&mut self, log: &StockLog) -> Result<(), StoreError> {
        self.shadow.stock_logs.push(log.clone());
        Ok(())
    }

    async fn list_stock_logs(
        &mut self,
        book_id: Option<BookId>,
        page: PageRequest,
    ) -> Result<(Vec<StockLog>, u64), StoreError> {
        let mut logs: Vec<StockLog> = self
            .shadow
            .stock_logs
            .iter()
            .filter(|l| book_id.map(|id| l.book_id == id).unwrap_or(true))
            .cloned()
            .collect();
        logs.reverse(); // append order -> newest first
        Ok(paginate(logs, page))
    }

    async fn append_operation_log(&mut self, log: &OperationLog) -> Result<(), StoreError> {
        self.shadow.operation_logs.push(log.clone());
        Ok(())
    }

    async fn list_operation_logs(
        &mut self,
        filter: &OperationLogFilter,
        page: PageRequest,
    ) -> Result<(Vec<OperationLog>, u64), StoreError> {
        let mut logs: Vec<OperationLog> = self
            .shadow
            .operation_logs
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        logs.reverse();
        Ok(paginate(logs, page))
    }

    // ── transaction control ──────────────────────────────────────────────

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        *self.guard = self.shadow;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookmart_catalog::BookDraft;
    use bookmart_core::Money;
    use rust_decimal_macros::dec;

    fn book(title: &str) -> Book {
        Book::create(
            BookId::new(),
            BookDraft {
                isbn: title.to_string(),
                title: title.to_string(),
                author: "a".to_string(),
                publisher: None,
                price: Money::new(dec!(10)).unwrap(),
                stock_quantity: 3,
                description: None,
                cover_image: None,
                category_id: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_transactions() {
        let store = InMemoryStore::new();
        let b = book("one");

        let mut tx = store.begin().await.unwrap();
        tx.insert_book(&b).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_book(b.id).await.unwrap().unwrap().title, "one");
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        let b = book("one");

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_book(&b).await.unwrap();
            // no commit
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_book(b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = InMemoryStore::new();
        let user = User::new(
            UserId::new(),
            "reader".to_string(),
            "r@example.com".to_string(),
            "h".to_string(),
            "R".to_string(),
            None,
            Utc::now(),
        )
        .unwrap();
        let clash = User::new(
            UserId::new(),
            "reader".to_string(),
            "other@example.com".to_string(),
            "h".to_string(),
            "O".to_string(),
            None,
            Utc::now(),
        )
        .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&user).await.unwrap();
        let err = tx.insert_user(&clash).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn pagination_slices_and_counts() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for i in 0..25 {
            tx.insert_book(&book(&format!("book {i}"))).await.unwrap();
        }
        let (page2, total) = tx
            .search_books(&BookSearchParams::default(), false, PageRequest::new(2, 10))
            .await
            .unwrap();
        assert_eq!(total, 25);
        assert_eq!(page2.len(), 10);

        let (page3, _) = tx
            .search_books(&BookSearchParams::default(), false, PageRequest::new(3, 10))
            .await
            .unwrap();
        assert_eq!(page3.len(), 5);
    }
}
