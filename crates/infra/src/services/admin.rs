//! Back-office workflows: admin login, catalog management, order and user
//! administration, audited stock adjustment, dashboard counters.
//!
//! Every mutating operation writes an `OperationLog` row in the same
//! transaction as the change itself, so the audit trail cannot miss a
//! committed mutation.

use std::sync::Arc;

use chrono::{Datelike, NaiveTime, Utc};
use tracing::instrument;

use bookmart_auth::{Admin, PasswordHasher, User, UserStatus};
use bookmart_catalog::{Book, BookDraft, BookPatch, BookSearchParams, Category};
use bookmart_core::{
    BookId, CategoryId, DomainError, DomainResult, OrderId, PageRequest, Paginated, StockLogId,
    UserId,
};
use bookmart_inventory::{StockLog, StockOperator};
use bookmart_orders::{Order, OrderStatus};

use crate::store::records::{
    DashboardStats, OperationLog, OperationLogFilter, OrderListFilter, UserListFilter,
};
use crate::store::Datastore;

/// Books with fewer units than this count as "low stock" on the dashboard.
const LOW_STOCK_THRESHOLD: i64 = 10;

/// The acting admin, recorded on every audit row.
#[derive(Debug, Clone)]
pub struct AdminActor {
    pub id: bookmart_core::AdminId,
    pub name: String,
}

impl AdminActor {
    fn log(&self, module: &str, action: &str) -> OperationLog {
        OperationLog::new(
            Some(self.id),
            Some(self.name.clone()),
            module,
            action,
            Utc::now(),
        )
    }
}

/// Outcome of a manual stock adjustment.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub book: Book,
    pub log: StockLog,
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Datastore>,
    hasher: PasswordHasher,
}

impl AdminService {
    pub fn new(store: Arc<dyn Datastore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Verify admin credentials and touch `last_login_at`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<Admin> {
        let mut tx = self.store.begin().await?;
        let mut admin = tx
            .find_admin_by_username(username)
            .await?
            .ok_or(DomainError::Unauthorized)?;
        if !self.hasher.verify(password, &admin.password_hash) {
            return Err(DomainError::Unauthorized);
        }
        if !admin.status.is_active() {
            return Err(DomainError::Unauthorized);
        }
        admin.last_login_at = Some(Utc::now());
        tx.update_admin(&admin).await?;
        tx.commit().await?;
        Ok(admin)
    }

    /// Resolve the acting admin for audit attribution.
    pub async fn actor(&self, admin_id: bookmart_core::AdminId) -> DomainResult<AdminActor> {
        let mut tx = self.store.begin().await?;
        let admin = tx
            .find_admin(admin_id)
            .await?
            .ok_or(DomainError::Unauthorized)?;
        Ok(AdminActor {
            id: admin.id,
            name: admin.username,
        })
    }

    /// Back-office admin roster, newest account first.
    pub async fn list_admins(&self, page: PageRequest) -> DomainResult<Paginated<Admin>> {
        let mut tx = self.store.begin().await?;
        let (admins, total) = tx.list_admins(page).await?;
        Ok(Paginated::new(admins, total, page))
    }

    // ── users ────────────────────────────────────────────────────────────

    pub async fn list_users(
        &self,
        filter: &UserListFilter,
        page: PageRequest,
    ) -> DomainResult<Paginated<User>> {
        let mut tx = self.store.begin().await?;
        let (users, total) = tx.list_users(filter, page).await?;
        Ok(Paginated::new(users, total, page))
    }

    /// Enable or disable a storefront account.
    #[instrument(skip(self, actor), fields(user_id = %user_id, active))]
    pub async fn set_user_status(
        &self,
        actor: &AdminActor,
        user_id: UserId,
        active: bool,
    ) -> DomainResult<User> {
        let mut tx = self.store.begin().await?;
        let mut user = tx
            .find_user(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        user.status = if active {
            UserStatus::Active
        } else {
            UserStatus::Disabled
        };
        tx.update_user(&user).await?;

        let action = if active { "enable" } else { "disable" };
        let log = actor
            .log("users", action)
            .with_target("user", user.id.to_string());
        tx.append_operation_log(&log).await?;
        tx.commit().await?;
        Ok(user)
    }

    // ── catalog ──────────────────────────────────────────────────────────

    /// Back-office book listing: inactive books included.
    pub async fn list_books(
        &self,
        params: &BookSearchParams,
        page: PageRequest,
    ) -> DomainResult<Paginated<Book>> {
        let mut tx = self.store.begin().await?;
        let (books, total) = tx.search_books(params, true, page).await?;
        Ok(Paginated::new(books, total, page))
    }

    #[instrument(skip(self, actor, draft))]
    pub async fn create_book(&self, actor: &AdminActor, draft: BookDraft) -> DomainResult<Book> {
        let book = Book::create(BookId::new(), draft, Utc::now())?;
        let mut tx = self.store.begin().await?;
        tx.insert_book(&book).await?;

        let log = actor
            .log("books", "create")
            .with_target("book", book.id.to_string())
            .with_detail(book.title.clone());
        tx.append_operation_log(&log).await?;
        tx.commit().await?;
        Ok(book)
    }

    #[instrument(skip(self, actor, patch), fields(book_id = %book_id))]
    pub async fn update_book(
        &self,
        actor: &AdminActor,
        book_id: BookId,
        patch: BookPatch,
    ) -> DomainResult<Book> {
        let mut tx = self.store.begin().await?;
        let mut book = tx
            .find_book(book_id)
            .await?
            .ok_or(DomainError::BookNotFound)?;
        book.apply_patch(patch)?;
        tx.update_book(&book).await?;

        let log = actor
            .log("books", "update")
            .with_target("book", book.id.to_string());
        tx.append_operation_log(&log).await?;
        tx.commit().await?;
        Ok(book)
    }

    #[instrument(skip(self, actor), fields(book_id = %book_id))]
    pub async fn delete_book(&self, actor: &AdminActor, book_id: BookId) -> DomainResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_book(book_id).await? {
            return Err(DomainError::BookNotFound);
        }
        let log = actor
            .log("books", "delete")
            .with_target("book", book_id.to_string());
        tx.append_operation_log(&log).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, actor))]
    pub async fn create_category(
        &self,
        actor: &AdminActor,
        name: String,
    ) -> DomainResult<Category> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        let category = Category::new(CategoryId::new(), name);
        let mut tx = self.store.begin().await?;
        tx.insert_category(&category).await?;

        let log = actor
            .log("categories", "create")
            .with_target("category", category.id.to_string())
            .with_detail(category.name.clone());
        tx.append_operation_log(&log).await?;
        tx.commit().await?;
        Ok(category)
    }

    // ── inventory ────────────────────────────────────────────────────────

    /// Manual stock adjustment, audited in the stock ledger and the operation
    /// log within the same transaction. A negative result is allowed here
    /// (admin override); only the sale path refuses to go below zero.
    #[instrument(skip(self, actor, remark), fields(book_id = %book_id, delta))]
    pub async fn adjust_stock(
        &self,
        actor: &AdminActor,
        book_id: BookId,
        delta: i64,
        remark: Option<String>,
    ) -> DomainResult<StockAdjustment> {
        if delta == 0 {
            return Err(DomainError::validation("stock delta cannot be zero"));
        }
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let locked = tx.lock_books(&[book_id]).await?;
        let mut book = locked.into_iter().next().ok_or(DomainError::BookNotFound)?;

        let before = book.stock_quantity;
        book.stock_quantity += delta;
        tx.update_book(&book).await?;

        let stock_log = StockLog::adjustment(
            StockLogId::new(),
            book.id,
            before,
            delta,
            StockOperator::Admin(actor.id),
            remark,
            now,
        );
        tx.append_stock_log(&stock_log).await?;

        let op_log = actor
            .log("inventory", "adjust_stock")
            .with_target("book", book.id.to_string())
            .with_detail(format!("{before} -> {} ({delta:+})", book.stock_quantity));
        tx.append_operation_log(&op_log).await?;
        tx.commit().await?;

        tracing::info!(book_id = %book.id, before, after = book.stock_quantity, "stock adjusted");
        Ok(StockAdjustment {
            book,
            log: stock_log,
        })
    }

    pub async fn stock_logs(
        &self,
        book_id: Option<BookId>,
        page: PageRequest,
    ) -> DomainResult<Paginated<StockLog>> {
        let mut tx = self.store.begin().await?;
        let (logs, total) = tx.list_stock_logs(book_id, page).await?;
        Ok(Paginated::new(logs, total, page))
    }

    // ── orders ───────────────────────────────────────────────────────────

    pub async fn list_orders(
        &self,
        filter: &OrderListFilter,
        page: PageRequest,
    ) -> DomainResult<Paginated<Order>> {
        let mut tx = self.store.begin().await?;
        let (orders, total) = tx.list_orders(filter, page).await?;
        Ok(Paginated::new(orders, total, page))
    }

    /// Move an order along its lifecycle; illegal transitions are rejected by
    /// the order itself.
    #[instrument(skip(self, actor), fields(order_id = %order_id, next = next.as_str()))]
    pub async fn update_order_status(
        &self,
        actor: &AdminActor,
        order_id: OrderId,
        next: OrderStatus,
    ) -> DomainResult<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound)?;
        let previous = order.status;
        order.transition_to(next)?;
        tx.update_order(&order).await?;

        let log = actor
            .log("orders", "update_status")
            .with_target("order", order.id.to_string())
            .with_detail(format!("{} -> {}", previous.as_str(), next.as_str()));
        tx.append_operation_log(&log).await?;
        tx.commit().await?;
        Ok(order)
    }

    // ── audit & dashboard ────────────────────────────────────────────────

    pub async fn operation_logs(
        &self,
        filter: &OperationLogFilter,
        page: PageRequest,
    ) -> DomainResult<Paginated<OperationLog>> {
        let mut tx = self.store.begin().await?;
        let (logs, total) = tx.list_operation_logs(filter, page).await?;
        Ok(Paginated::new(logs, total, page))
    }

    /// Counters for the back-office landing page. Monthly revenue counts only
    /// orders that were actually paid for (paid/shipped/delivered).
    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> DomainResult<DashboardStats> {
        let now = Utc::now();
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let month_start = now
            .date_naive()
            .with_day(1)
            .unwrap_or(now.date_naive())
            .and_time(NaiveTime::MIN)
            .and_utc();

        let mut tx = self.store.begin().await?;
        let stats = DashboardStats {
            total_users: tx.count_users().await?,
            total_books: tx.count_books().await?,
            total_orders: tx.count_orders().await?,
            today_orders: tx.count_orders_since(today).await?,
            pending_orders: tx.count_orders_with_status(OrderStatus::Pending).await?,
            low_stock_books: tx.count_low_stock(LOW_STOCK_THRESHOLD).await?,
            monthly_revenue: tx
                .revenue_since(
                    month_start,
                    &[OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Delivered],
                )
                .await?,
        };
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Datastore, InMemoryStore};
    use bookmart_auth::Permission;
    use bookmart_core::{AdminId, Money};
    use bookmart_inventory::StockChangeType;
    use rust_decimal_macros::dec;

    // bcrypt's minimum cost (the crate keeps the constant private).
    const MIN_COST: u32 = 4;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST)
    }

    fn actor() -> AdminActor {
        AdminActor {
            id: AdminId::new(),
            name: "root".to_string(),
        }
    }

    fn draft(title: &str, stock: i64) -> BookDraft {
        BookDraft {
            isbn: format!("isbn-{title}"),
            title: title.to_string(),
            author: "an author".to_string(),
            publisher: None,
            price: Money::new(dec!(10)).unwrap(),
            stock_quantity: stock,
            description: None,
            cover_image: None,
            category_id: None,
        }
    }

    async fn seed_admin(store: &InMemoryStore, username: &str, password: &str) -> Admin {
        let admin = Admin {
            id: AdminId::new(),
            username: username.to_string(),
            password_hash: hasher().hash(password).unwrap(),
            full_name: "Root".to_string(),
            permissions: vec![Permission::new("*")],
            status: UserStatus::Active,
            last_login_at: None,
            created_at: Utc::now(),
        };
        let mut tx = store.begin().await.unwrap();
        tx.insert_admin(&admin).await.unwrap();
        tx.commit().await.unwrap();
        admin
    }

    #[tokio::test]
    async fn login_touches_last_login() {
        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        seed_admin(&store, "root", "hunter42").await;

        let admin = admins.login("root", "hunter42").await.unwrap();
        assert!(admin.last_login_at.is_some());
        assert_eq!(
            admins.login("root", "wrong").await.unwrap_err(),
            DomainError::Unauthorized
        );
    }

    #[tokio::test]
    async fn adjust_stock_writes_both_audit_rows() {
        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        let actor = actor();
        let book = admins.create_book(&actor, draft("ledger", 10)).await.unwrap();

        let result = admins
            .adjust_stock(&actor, book.id, 5, Some("restock".to_string()))
            .await
            .unwrap();
        assert_eq!(result.book.stock_quantity, 15);
        assert_eq!(result.log.before_quantity, 10);
        assert_eq!(result.log.after_quantity, 15);
        assert_eq!(result.log.delta, 5);
        assert_eq!(result.log.change_type, StockChangeType::In);
        assert_eq!(result.log.operator, StockOperator::Admin(actor.id));

        let ops = admins
            .operation_logs(
                &OperationLogFilter {
                    module: Some("inventory".to_string()),
                    ..OperationLogFilter::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(ops.pagination.total, 1);
        assert_eq!(ops.data[0].action, "adjust_stock");
    }

    #[tokio::test]
    async fn negative_adjustment_may_overdraw_stock() {
        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        let actor = actor();
        let book = admins.create_book(&actor, draft("shrinkage", 2)).await.unwrap();

        let result = admins
            .adjust_stock(&actor, book.id, -3, Some("damaged".to_string()))
            .await
            .unwrap();
        assert_eq!(result.book.stock_quantity, -1);
        assert_eq!(result.log.change_type, StockChangeType::Out);
    }

    #[tokio::test]
    async fn zero_delta_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        let actor = actor();
        let book = admins.create_book(&actor, draft("noop", 2)).await.unwrap();

        let err = admins
            .adjust_stock(&actor, book.id, 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn illegal_order_transition_is_rejected() {
        use crate::services::cart::CartService;
        use crate::services::checkout::CheckoutService;
        use bookmart_cart::Cart;
        use bookmart_core::{CartId, UserId};

        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        let actor = actor();
        let book = admins.create_book(&actor, draft("ordered", 5)).await.unwrap();

        let user_id = UserId::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_cart(&Cart::new(CartId::new(), user_id, Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        CartService::new(store.clone())
            .add_to_cart(user_id, book.id, 1)
            .await
            .unwrap();
        let order = CheckoutService::new(store.clone())
            .checkout(user_id, "42 Main St".to_string())
            .await
            .unwrap()
            .order;

        // Pending -> Shipped skips payment.
        let err = admins
            .update_order_status(&actor, order.id, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let paid = admins
            .update_order_status(&actor, order.id, OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn list_admins_is_paginated_newest_first() {
        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        seed_admin(&store, "root", "hunter42").await;
        seed_admin(&store, "clerk", "hunter42").await;

        let page = admins.list_admins(PageRequest::new(1, 1)).await.unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].username, "clerk");

        let rest = admins.list_admins(PageRequest::new(2, 1)).await.unwrap();
        assert_eq!(rest.data[0].username, "root");
    }

    #[tokio::test]
    async fn concurrent_status_updates_leave_one_winner() {
        use crate::services::cart::CartService;
        use crate::services::checkout::CheckoutService;
        use bookmart_cart::Cart;
        use bookmart_core::{CartId, UserId};

        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        let actor = actor();
        let book = admins.create_book(&actor, draft("raced", 5)).await.unwrap();

        let user_id = UserId::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_cart(&Cart::new(CartId::new(), user_id, Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        CartService::new(store.clone())
            .add_to_cart(user_id, book.id, 1)
            .await
            .unwrap();
        let order = CheckoutService::new(store.clone())
            .checkout(user_id, "42 Main St".to_string())
            .await
            .unwrap()
            .order;

        // Both admins try to mark the same pending order paid; the row lock
        // makes the loser observe the committed Paid state and fail.
        let mut handles = Vec::new();
        for _ in 0..2 {
            let admins = admins.clone();
            let actor = actor.clone();
            let order_id = order.id;
            handles.push(tokio::spawn(async move {
                admins
                    .update_order_status(&actor, order_id, OrderStatus::Paid)
                    .await
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn dashboard_counts_low_stock_and_pending() {
        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        let actor = actor();
        admins.create_book(&actor, draft("scarce", 3)).await.unwrap();
        admins.create_book(&actor, draft("plenty", 50)).await.unwrap();

        let stats = admins.dashboard_stats().await.unwrap();
        assert_eq!(stats.total_books, 2);
        assert_eq!(stats.low_stock_books, 1);
        assert_eq!(stats.pending_orders, 0);
        assert_eq!(stats.monthly_revenue, dec!(0));
    }

    #[tokio::test]
    async fn deleting_missing_book_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        let err = admins.delete_book(&actor(), BookId::new()).await.unwrap_err();
        assert_eq!(err, DomainError::BookNotFound);
    }

    #[tokio::test]
    async fn disable_then_enable_user_is_audited() {
        use crate::services::users::{RegisterUser, UserService};

        let store = Arc::new(InMemoryStore::new());
        let admins = AdminService::new(store.clone(), hasher());
        let users = UserService::new(store.clone(), hasher());
        let actor = actor();

        let user = users
            .register(RegisterUser {
                username: "reader".to_string(),
                email: "r@example.com".to_string(),
                password: "hunter42".to_string(),
                full_name: "A Reader".to_string(),
                phone: None,
            })
            .await
            .unwrap();

        let disabled = admins.set_user_status(&actor, user.id, false).await.unwrap();
        assert_eq!(disabled.status, UserStatus::Disabled);
        let enabled = admins.set_user_status(&actor, user.id, true).await.unwrap();
        assert_eq!(enabled.status, UserStatus::Active);

        let ops = admins
            .operation_logs(
                &OperationLogFilter {
                    module: Some("users".to_string()),
                    ..OperationLogFilter::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(ops.pagination.total, 2);
    }
}
