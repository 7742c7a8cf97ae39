use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bookmart_auth::{Admin, User};
use bookmart_cart::{Cart, CartLine};
use bookmart_catalog::{Book, BookSearchParams, Category};
use bookmart_core::{AdminId, BookId, CartId, CartLineId, OrderId, PageRequest, UserId};
use bookmart_inventory::StockLog;
use bookmart_orders::{Order, OrderLine, OrderStatus};

use super::records::{OperationLog, OperationLogFilter, OrderListFilter, UserListFilter};
use super::StoreError;

/// Handle to a relational datastore.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Open a transaction. Everything done through the returned [`StoreTx`]
    /// commits atomically or not at all; dropping it rolls back.
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTx + 'a>, StoreError>;
}

/// One open transaction against the datastore.
///
/// Row-returning reads come back in the order the domain expects (carts by
/// recency, orders/books/logs newest first). `lock_books` takes row locks on
/// the given books for the remainder of the transaction; concurrent
/// transactions locking the same rows serialize behind it, which is what
/// keeps two checkouts from both validating against the same stale stock.
#[async_trait]
pub trait StoreTx: Send {
    // ── users ────────────────────────────────────────────────────────────
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username_or_email(
        &mut self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;
    async fn update_user(&mut self, user: &User) -> Result<(), StoreError>;
    async fn list_users(
        &mut self,
        filter: &UserListFilter,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), StoreError>;
    async fn count_users(&mut self) -> Result<u64, StoreError>;

    // ── admins ───────────────────────────────────────────────────────────
    async fn insert_admin(&mut self, admin: &Admin) -> Result<(), StoreError>;
    async fn find_admin(&mut self, id: AdminId) -> Result<Option<Admin>, StoreError>;
    async fn find_admin_by_username(&mut self, username: &str) -> Result<Option<Admin>, StoreError>;
    async fn update_admin(&mut self, admin: &Admin) -> Result<(), StoreError>;
    /// Admin accounts, newest first.
    async fn list_admins(&mut self, page: PageRequest) -> Result<(Vec<Admin>, u64), StoreError>;

    // ── catalog ──────────────────────────────────────────────────────────
    async fn insert_category(&mut self, category: &Category) -> Result<(), StoreError>;
    /// Categories by name, ascending.
    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError>;

    async fn insert_book(&mut self, book: &Book) -> Result<(), StoreError>;
    async fn find_book(&mut self, id: BookId) -> Result<Option<Book>, StoreError>;
    /// Lock the given book rows (`SELECT ... FOR UPDATE` on Postgres) and
    /// return their live state. Ids are locked in sorted order so two
    /// transactions over overlapping sets cannot deadlock.
    async fn lock_books(&mut self, ids: &[BookId]) -> Result<Vec<Book>, StoreError>;
    async fn update_book(&mut self, book: &Book) -> Result<(), StoreError>;
    async fn delete_book(&mut self, id: BookId) -> Result<bool, StoreError>;
    async fn search_books(
        &mut self,
        params: &BookSearchParams,
        include_inactive: bool,
        page: PageRequest,
    ) -> Result<(Vec<Book>, u64), StoreError>;
    /// Active books by sales count, descending.
    async fn featured_books(&mut self, limit: usize) -> Result<Vec<Book>, StoreError>;
    async fn count_books(&mut self) -> Result<u64, StoreError>;
    async fn count_low_stock(&mut self, threshold: i64) -> Result<u64, StoreError>;

    // ── carts ────────────────────────────────────────────────────────────
    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), StoreError>;
    async fn find_cart_by_user(&mut self, user_id: UserId) -> Result<Option<Cart>, StoreError>;
    /// Lines for a cart, most recently added first.
    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, StoreError>;
    async fn find_cart_line(
        &mut self,
        cart_id: CartId,
        book_id: BookId,
    ) -> Result<Option<CartLine>, StoreError>;
    async fn find_cart_line_by_id(
        &mut self,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError>;
    async fn insert_cart_line(&mut self, line: &CartLine) -> Result<(), StoreError>;
    async fn update_cart_line_quantity(
        &mut self,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<(), StoreError>;
    async fn delete_cart_line(&mut self, line_id: CartLineId) -> Result<(), StoreError>;
    async fn delete_cart_lines(&mut self, cart_id: CartId) -> Result<(), StoreError>;

    // ── orders ───────────────────────────────────────────────────────────
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;
    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<(), StoreError>;
    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;
    /// Like [`find_order`](Self::find_order) but takes a row lock, so a
    /// status transition reads the state no concurrent transaction can
    /// still change underneath it.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;
    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError>;
    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError>;
    /// A user's orders, newest first.
    async fn list_user_orders(
        &mut self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), StoreError>;
    /// Admin listing, newest first.
    async fn list_orders(
        &mut self,
        filter: &OrderListFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), StoreError>;
    async fn count_orders(&mut self) -> Result<u64, StoreError>;
    async fn count_orders_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError>;
    async fn count_orders_with_status(&mut self, status: OrderStatus) -> Result<u64, StoreError>;
    /// Revenue (sum of totals) over orders with the given statuses since a
    /// point in time. Exact decimal sum.
    async fn revenue_since(
        &mut self,
        since: DateTime<Utc>,
        statuses: &[OrderStatus],
    ) -> Result<Decimal, StoreError>;

    // ── audit ────────────────────────────────────────────────────────────
    async fn append_stock_log(&mut self, log: &StockLog) -> Result<(), StoreError>;
    /// Stock ledger, newest first, optionally scoped to one book.
    async fn list_stock_logs(
        &mut self,
        book_id: Option<BookId>,
        page: PageRequest,
    ) -> Result<(Vec<StockLog>, u64), StoreError>;
    async fn append_operation_log(&mut self, log: &OperationLog) -> Result<(), StoreError>;
    async fn list_operation_logs(
        &mut self,
        filter: &OperationLogFilter,
        page: PageRequest,
    ) -> Result<(Vec<OperationLog>, u64), StoreError>;

    // ── transaction control ──────────────────────────────────────────────
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
