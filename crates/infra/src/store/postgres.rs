//! Postgres-backed datastore.
//!
//! All access goes through real database transactions; `lock_books` issues
//! `SELECT ... FOR UPDATE` so the checkout and stock-adjustment paths hold row
//! locks from validation through write-back. Optional list filters use the
//! `($n::type IS NULL OR column = $n)` pattern so each listing stays one
//! parameterized query.
//!
//! ## Error mapping
//!
//! | PostgreSQL error code | StoreError |
//! |-----------------------|------------|
//! | `23505` (unique violation) | `Conflict` |
//! | anything else | `Backend` |

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};

use bookmart_auth::{Admin, Permission, User, UserStatus};
use bookmart_cart::{Cart, CartLine};
use bookmart_catalog::{Book, BookSearchParams, BookStatus, Category};
use bookmart_core::{AdminId, BookId, CartId, CartLineId, Money, OrderId, PageRequest, UserId};
use bookmart_inventory::{StockChangeType, StockLog, StockOperator};
use bookmart_orders::{Order, OrderLine, OrderStatus};

use super::records::{OperationLog, OperationLogFilter, OrderListFilter, UserListFilter};
use super::r#trait::{Datastore, StoreTx};
use super::StoreError;

/// Postgres implementation of [`Datastore`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl Datastore for PostgresStore {
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTx + 'a>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn decode_err(
    column: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

fn like_pattern(needle: &str) -> String {
    format!("%{needle}%")
}

// Row wrappers. Status/enum columns are stored as text and parsed on the way
// out; a malformed row surfaces as a column decode error rather than a panic.

struct UserRow(User);

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = parse_user_status(&status).map_err(|e| decode_err("status", e))?;
        Ok(UserRow(User {
            id: UserId::from_uuid(row.try_get("id")?),
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            postal_code: row.try_get("postal_code")?,
            status,
            created_at: row.try_get("created_at")?,
        }))
    }
}

struct AdminRow(Admin);

impl<'r> FromRow<'r, PgRow> for AdminRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = parse_user_status(&status).map_err(|e| decode_err("status", e))?;
        let permissions: Vec<String> = row.try_get("permissions")?;
        Ok(AdminRow(Admin {
            id: row.try_get::<uuid::Uuid, _>("id")?.into(),
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            permissions: permissions.into_iter().map(Permission::new).collect(),
            status,
            last_login_at: row.try_get("last_login_at")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

struct BookRow(Book);

impl<'r> FromRow<'r, PgRow> for BookRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = parse_book_status(&status).map_err(|e| decode_err("status", e))?;
        let price: Decimal = row.try_get("price")?;
        let price = Money::new(price).map_err(|e| decode_err("price", e))?;
        Ok(BookRow(Book {
            id: BookId::from_uuid(row.try_get("id")?),
            isbn: row.try_get("isbn")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            publisher: row.try_get("publisher")?,
            price,
            stock_quantity: row.try_get("stock_quantity")?,
            sales_count: row.try_get("sales_count")?,
            description: row.try_get("description")?,
            cover_image: row.try_get("cover_image")?,
            category_id: row
                .try_get::<Option<uuid::Uuid>, _>("category_id")?
                .map(Into::into),
            status,
            created_at: row.try_get("created_at")?,
        }))
    }
}

struct CartLineRow(CartLine);

impl<'r> FromRow<'r, PgRow> for CartLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CartLineRow(CartLine {
            id: CartLineId::from_uuid(row.try_get("id")?),
            cart_id: CartId::from_uuid(row.try_get("cart_id")?),
            book_id: BookId::from_uuid(row.try_get("book_id")?),
            quantity: row.try_get("quantity")?,
            added_at: row.try_get("added_at")?,
        }))
    }
}

struct OrderRow(Order);

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = OrderStatus::from_str(&status).map_err(|e| decode_err("status", e))?;
        let total: Decimal = row.try_get("total_amount")?;
        let total = Money::new(total).map_err(|e| decode_err("total_amount", e))?;
        Ok(OrderRow(Order {
            id: OrderId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            total_amount: total,
            status,
            shipping_address: row.try_get("shipping_address")?,
            order_date: row.try_get("order_date")?,
        }))
    }
}

struct OrderLineRow(OrderLine);

impl<'r> FromRow<'r, PgRow> for OrderLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let unit_price: Decimal = row.try_get("unit_price")?;
        let unit_price = Money::new(unit_price).map_err(|e| decode_err("unit_price", e))?;
        Ok(OrderLineRow(OrderLine {
            id: row.try_get::<uuid::Uuid, _>("id")?.into(),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            book_id: BookId::from_uuid(row.try_get("book_id")?),
            book_title: row.try_get("book_title")?,
            quantity: row.try_get("quantity")?,
            unit_price,
        }))
    }
}

struct StockLogRow(StockLog);

impl<'r> FromRow<'r, PgRow> for StockLogRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let change_type: String = row.try_get("change_type")?;
        let change_type =
            parse_change_type(&change_type).map_err(|e| decode_err("change_type", e))?;
        let operator_kind: String = row.try_get("operator_kind")?;
        let operator_admin: Option<uuid::Uuid> = row.try_get("operator_admin_id")?;
        let operator = match (operator_kind.as_str(), operator_admin) {
            ("system", _) => StockOperator::System,
            ("admin", Some(id)) => StockOperator::Admin(id.into()),
            _ => {
                return Err(decode_err(
                    "operator_kind",
                    bookmart_core::DomainError::validation(format!(
                        "unknown stock operator '{operator_kind}'"
                    )),
                ))
            }
        };
        Ok(StockLogRow(StockLog {
            id: row.try_get::<uuid::Uuid, _>("id")?.into(),
            book_id: BookId::from_uuid(row.try_get("book_id")?),
            change_type,
            before_quantity: row.try_get("before_quantity")?,
            after_quantity: row.try_get("after_quantity")?,
            delta: row.try_get("delta")?,
            related_order_id: row
                .try_get::<Option<uuid::Uuid>, _>("related_order_id")?
                .map(Into::into),
            operator,
            remark: row.try_get("remark")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

struct OperationLogRow(OperationLog);

impl<'r> FromRow<'r, PgRow> for OperationLogRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OperationLogRow(OperationLog {
            id: row.try_get("id")?,
            admin_id: row
                .try_get::<Option<uuid::Uuid>, _>("admin_id")?
                .map(Into::into),
            admin_name: row.try_get("admin_name")?,
            module: row.try_get("module")?,
            action: row.try_get("action")?,
            target_type: row.try_get("target_type")?,
            target_id: row.try_get("target_id")?,
            detail: row.try_get("detail")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

fn parse_user_status(s: &str) -> Result<UserStatus, bookmart_core::DomainError> {
    match s {
        "active" => Ok(UserStatus::Active),
        "disabled" => Ok(UserStatus::Disabled),
        other => Err(bookmart_core::DomainError::validation(format!(
            "unknown user status '{other}'"
        ))),
    }
}

fn user_status_str(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "active",
        UserStatus::Disabled => "disabled",
    }
}

fn parse_book_status(s: &str) -> Result<BookStatus, bookmart_core::DomainError> {
    match s {
        "active" => Ok(BookStatus::Active),
        "inactive" => Ok(BookStatus::Inactive),
        other => Err(bookmart_core::DomainError::validation(format!(
            "unknown book status '{other}'"
        ))),
    }
}

fn book_status_str(status: BookStatus) -> &'static str {
    match status {
        BookStatus::Active => "active",
        BookStatus::Inactive => "inactive",
    }
}

fn parse_change_type(s: &str) -> Result<StockChangeType, bookmart_core::DomainError> {
    match s {
        "sale" => Ok(StockChangeType::Sale),
        "in" => Ok(StockChangeType::In),
        "out" => Ok(StockChangeType::Out),
        other => Err(bookmart_core::DomainError::validation(format!(
            "unknown stock change type '{other}'"
        ))),
    }
}

fn change_type_str(change_type: StockChangeType) -> &'static str {
    match change_type {
        StockChangeType::Sale => "sale",
        StockChangeType::In => "in",
        StockChangeType::Out => "out",
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, phone, address, city, postal_code, status, created_at";
const BOOK_COLUMNS: &str = "id, isbn, title, author, publisher, price, stock_quantity, sales_count, description, cover_image, category_id, status, created_at";
const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, shipping_address, order_date";

#[async_trait]
impl StoreTx for PgTx {
    // ── users ────────────────────────────────────────────────────────────

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, full_name, phone, address, city, postal_code, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.city)
        .bind(&user.postal_code)
        .bind(user_status_str(user.status))
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| UserRow::from_row(&r).map(|u| u.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(|r| UserRow::from_row(&r).map(|u| u.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn find_user_by_username_or_email(
        &mut self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2 LIMIT 1"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(|r| UserRow::from_row(&r).map(|u| u.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn update_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, full_name = $5,
                phone = $6, address = $7, city = $8, postal_code = $9, status = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.city)
        .bind(&user.postal_code)
        .bind(user_status_str(user.status))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_users(
        &mut self,
        filter: &UserListFilter,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), StoreError> {
        let pattern = filter.keyword.as_deref().map(like_pattern);
        let active = filter.active_only.map(|a| {
            if a {
                "active"
            } else {
                "disabled"
            }
        });

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM users
            WHERE ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1 OR full_name ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(&pattern)
        .bind(active)
        .fetch_one(&mut *self.tx)
        .await?;
        let total: i64 = count_row.try_get("total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1 OR full_name ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&pattern)
        .bind(active)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(UserRow::from_row(&row)?.0);
        }
        Ok((users, total as u64))
    }

    async fn count_users(&mut self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&mut *self.tx)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    // ── admins ───────────────────────────────────────────────────────────

    async fn insert_admin(&mut self, admin: &Admin) -> Result<(), StoreError> {
        let permissions: Vec<String> = admin
            .permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        sqlx::query(
            r#"
            INSERT INTO admins (id, username, password_hash, full_name, permissions, status, last_login_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(admin.id.as_uuid())
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(&admin.full_name)
        .bind(&permissions)
        .bind(user_status_str(admin.status))
        .bind(admin.last_login_at)
        .bind(admin.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_admin(&mut self, id: AdminId) -> Result<Option<Admin>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, full_name, permissions, status, last_login_at, created_at FROM admins WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(|r| AdminRow::from_row(&r).map(|a| a.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn find_admin_by_username(&mut self, username: &str) -> Result<Option<Admin>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, full_name, permissions, status, last_login_at, created_at FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(|r| AdminRow::from_row(&r).map(|a| a.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn update_admin(&mut self, admin: &Admin) -> Result<(), StoreError> {
        let permissions: Vec<String> = admin
            .permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        sqlx::query(
            r#"
            UPDATE admins
            SET password_hash = $2, full_name = $3, permissions = $4, status = $5, last_login_at = $6
            WHERE id = $1
            "#,
        )
        .bind(admin.id.as_uuid())
        .bind(&admin.password_hash)
        .bind(&admin.full_name)
        .bind(&permissions)
        .bind(user_status_str(admin.status))
        .bind(admin.last_login_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_admins(&mut self, page: PageRequest) -> Result<(Vec<Admin>, u64), StoreError> {
        let count_row = sqlx::query("SELECT COUNT(*) AS total FROM admins")
            .fetch_one(&mut *self.tx)
            .await?;
        let total: i64 = count_row.try_get("total")?;

        let rows = sqlx::query(
            r#"
            SELECT id, username, password_hash, full_name, permissions, status, last_login_at, created_at
            FROM admins
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut admins = Vec::with_capacity(rows.len());
        for row in rows {
            admins.push(AdminRow::from_row(&row)?.0);
        }
        Ok((admins, total as u64))
    }

    // ── catalog ──────────────────────────────────────────────────────────

    async fn insert_category(&mut self, category: &Category) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name ASC")
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(Category {
                    id: row.try_get::<uuid::Uuid, _>("id")?.into(),
                    name: row.try_get("name")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(Into::into)
    }

    async fn insert_book(&mut self, book: &Book) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO books (id, isbn, title, author, publisher, price, stock_quantity, sales_count, description, cover_image, category_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.price.amount())
        .bind(book.stock_quantity)
        .bind(book.sales_count)
        .bind(&book.description)
        .bind(&book.cover_image)
        .bind(book.category_id.map(|id| *id.as_uuid()))
        .bind(book_status_str(book.status))
        .bind(book.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_book(&mut self, id: BookId) -> Result<Option<Book>, StoreError> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| BookRow::from_row(&r).map(|b| b.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn lock_books(&mut self, ids: &[BookId]) -> Result<Vec<Book>, StoreError> {
        // Sorted lock order keeps two overlapping checkouts from deadlocking.
        let mut uuids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        uuids.sort();
        uuids.dedup();

        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ANY($1) ORDER BY id ASC FOR UPDATE"
        ))
        .bind(&uuids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(BookRow::from_row(&row)?.0);
        }
        Ok(books)
    }

    async fn update_book(&mut self, book: &Book) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE books
            SET isbn = $2, title = $3, author = $4, publisher = $5, price = $6,
                stock_quantity = $7, sales_count = $8, description = $9,
                cover_image = $10, category_id = $11, status = $12
            WHERE id = $1
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.price.amount())
        .bind(book.stock_quantity)
        .bind(book.sales_count)
        .bind(&book.description)
        .bind(&book.cover_image)
        .bind(book.category_id.map(|id| *id.as_uuid()))
        .bind(book_status_str(book.status))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_book(&mut self, id: BookId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_books(
        &mut self,
        params: &BookSearchParams,
        include_inactive: bool,
        page: PageRequest,
    ) -> Result<(Vec<Book>, u64), StoreError> {
        let keyword = params.keyword.as_deref().map(like_pattern);
        let author = params.author.as_deref().map(like_pattern);
        let isbn = params.isbn.as_deref().map(like_pattern);
        let category = params.category_id.map(|id| *id.as_uuid());

        let filter_sql = r#"
              ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1 OR description ILIKE $1)
              AND ($2::uuid IS NULL OR category_id = $2)
              AND ($3::text IS NULL OR author ILIKE $3)
              AND ($4::text IS NULL OR isbn LIKE $4)
              AND ($5::boolean OR status = 'active')
        "#;

        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM books WHERE {filter_sql}"
        ))
        .bind(&keyword)
        .bind(category)
        .bind(&author)
        .bind(&isbn)
        .bind(include_inactive)
        .fetch_one(&mut *self.tx)
        .await?;
        let total: i64 = count_row.try_get("total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOK_COLUMNS} FROM books
            WHERE {filter_sql}
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(&keyword)
        .bind(category)
        .bind(&author)
        .bind(&isbn)
        .bind(include_inactive)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(BookRow::from_row(&row)?.0);
        }
        Ok((books, total as u64))
    }

    async fn featured_books(&mut self, limit: usize) -> Result<Vec<Book>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOK_COLUMNS} FROM books
            WHERE status = 'active'
            ORDER BY sales_count DESC, id DESC
            LIMIT $1
            "#
        ))
        .bind(limit as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(BookRow::from_row(&row)?.0);
        }
        Ok(books)
    }

    async fn count_books(&mut self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM books")
            .fetch_one(&mut *self.tx)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    async fn count_low_stock(&mut self, threshold: i64) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM books WHERE stock_quantity < $1")
            .bind(threshold)
            .fetch_one(&mut *self.tx)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    // ── carts ────────────────────────────────────────────────────────────

    async fn insert_cart(&mut self, cart: &Cart) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO carts (id, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(cart.id.as_uuid())
            .bind(cart.user_id.as_uuid())
            .bind(cart.created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_cart_by_user(&mut self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| {
            Ok::<_, sqlx::Error>(Cart {
                id: CartId::from_uuid(r.try_get("id")?),
                user_id: UserId::from_uuid(r.try_get("user_id")?),
                created_at: r.try_get("created_at")?,
            })
        })
        .transpose()
        .map_err(Into::into)
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, cart_id, book_id, quantity, added_at FROM cart_lines
            WHERE cart_id = $1
            ORDER BY added_at DESC, id DESC
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            lines.push(CartLineRow::from_row(&row)?.0);
        }
        Ok(lines)
    }

    async fn find_cart_line(
        &mut self,
        cart_id: CartId,
        book_id: BookId,
    ) -> Result<Option<CartLine>, StoreError> {
        let row = sqlx::query(
            "SELECT id, cart_id, book_id, quantity, added_at FROM cart_lines WHERE cart_id = $1 AND book_id = $2",
        )
        .bind(cart_id.as_uuid())
        .bind(book_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(|r| CartLineRow::from_row(&r).map(|l| l.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn find_cart_line_by_id(
        &mut self,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, StoreError> {
        let row = sqlx::query(
            "SELECT id, cart_id, book_id, quantity, added_at FROM cart_lines WHERE id = $1",
        )
        .bind(line_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(|r| CartLineRow::from_row(&r).map(|l| l.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn insert_cart_line(&mut self, line: &CartLine) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO cart_lines (id, cart_id, book_id, quantity, added_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(line.id.as_uuid())
        .bind(line.cart_id.as_uuid())
        .bind(line.book_id.as_uuid())
        .bind(line.quantity)
        .bind(line.added_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_cart_line_quantity(
        &mut self,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE cart_lines SET quantity = $2 WHERE id = $1")
            .bind(line_id.as_uuid())
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_cart_line(&mut self, line_id: CartLineId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_lines WHERE id = $1")
            .bind(line_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_cart_lines(&mut self, cart_id: CartId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    // ── orders ───────────────────────────────────────────────────────────

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_amount, status, shipping_address, order_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.total_amount.amount())
        .bind(order.status.as_str())
        .bind(&order.shipping_address)
        .bind(order.order_date)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO order_lines (id, order_id, book_id, book_title, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.order_id.as_uuid())
        .bind(line.book_id.as_uuid())
        .bind(&line.book_title)
        .bind(line.quantity)
        .bind(line.unit_price.amount())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| OrderRow::from_row(&r).map(|o| o.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(|r| OrderRow::from_row(&r).map(|o| o.0))
            .transpose()
            .map_err(Into::into)
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, order_id, book_id, book_title, quantity, unit_price FROM order_lines WHERE order_id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            lines.push(OrderLineRow::from_row(&row)?.0);
        }
        Ok(lines)
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(order.id.as_uuid())
            .bind(order.status.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_user_orders(
        &mut self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), StoreError> {
        let count_row = sqlx::query("SELECT COUNT(*) AS total FROM orders WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await?;
        let total: i64 = count_row.try_get("total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = $1
            ORDER BY order_date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(OrderRow::from_row(&row)?.0);
        }
        Ok((orders, total as u64))
    }

    async fn list_orders(
        &mut self,
        filter: &OrderListFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let user = filter.user_id.map(|id| *id.as_uuid());

        let filter_sql = r#"
              ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::timestamptz IS NULL OR order_date >= $3)
              AND ($4::timestamptz IS NULL OR order_date <= $4)
        "#;

        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM orders WHERE {filter_sql}"
        ))
        .bind(status)
        .bind(user)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&mut *self.tx)
        .await?;
        let total: i64 = count_row.try_get("total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE {filter_sql}
            ORDER BY order_date DESC, id DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(status)
        .bind(user)
        .bind(filter.from)
        .bind(filter.to)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(OrderRow::from_row(&row)?.0);
        }
        Ok((orders, total as u64))
    }

    async fn count_orders(&mut self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM orders")
            .fetch_one(&mut *self.tx)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    async fn count_orders_since(&mut self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM orders WHERE order_date >= $1")
            .bind(since)
            .fetch_one(&mut *self.tx)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    async fn count_orders_with_status(&mut self, status: OrderStatus) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM orders WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&mut *self.tx)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total as u64)
    }

    async fn revenue_since(
        &mut self,
        since: DateTime<Utc>,
        statuses: &[OrderStatus],
    ) -> Result<Decimal, StoreError> {
        let statuses: Vec<&str> = statuses.iter().map(OrderStatus::as_str).collect();
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_amount), 0) AS revenue FROM orders
            WHERE order_date >= $1 AND status = ANY($2)
            "#,
        )
        .bind(since)
        .bind(&statuses)
        .fetch_one(&mut *self.tx)
        .await?;
        let revenue: Decimal = row.try_get("revenue")?;
        Ok(revenue)
    }

    // ── audit ────────────────────────────────────────────────────────────

    async fn append_stock_log(&mut self, log: &StockLog) -> Result<(), StoreError> {
        let (operator_kind, operator_admin) = match log.operator {
            StockOperator::System => ("system", None),
            StockOperator::Admin(id) => ("admin", Some(*id.as_uuid())),
        };
        sqlx::query(
            r#"
            INSERT INTO stock_logs (id, book_id, change_type, before_quantity, after_quantity, delta, related_order_id, operator_kind, operator_admin_id, remark, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.book_id.as_uuid())
        .bind(change_type_str(log.change_type))
        .bind(log.before_quantity)
        .bind(log.after_quantity)
        .bind(log.delta)
        .bind(log.related_order_id.map(|id| *id.as_uuid()))
        .bind(operator_kind)
        .bind(operator_admin)
        .bind(&log.remark)
        .bind(log.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_stock_logs(
        &mut self,
        book_id: Option<BookId>,
        page: PageRequest,
    ) -> Result<(Vec<StockLog>, u64), StoreError> {
        let book = book_id.map(|id| *id.as_uuid());

        let count_row = sqlx::query(
            "SELECT COUNT(*) AS total FROM stock_logs WHERE ($1::uuid IS NULL OR book_id = $1)",
        )
        .bind(book)
        .fetch_one(&mut *self.tx)
        .await?;
        let total: i64 = count_row.try_get("total")?;

        let rows = sqlx::query(
            r#"
            SELECT id, book_id, change_type, before_quantity, after_quantity, delta, related_order_id, operator_kind, operator_admin_id, remark, created_at
            FROM stock_logs
            WHERE ($1::uuid IS NULL OR book_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(book)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut logs = Vec::with_capacity(rows.len());
        for row in rows {
            logs.push(StockLogRow::from_row(&row)?.0);
        }
        Ok((logs, total as u64))
    }

    async fn append_operation_log(&mut self, log: &OperationLog) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO operation_logs (id, admin_id, admin_name, module, action, target_type, target_id, detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.id)
        .bind(log.admin_id.map(|id| *id.as_uuid()))
        .bind(&log.admin_name)
        .bind(&log.module)
        .bind(&log.action)
        .bind(&log.target_type)
        .bind(&log.target_id)
        .bind(&log.detail)
        .bind(log.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_operation_logs(
        &mut self,
        filter: &OperationLogFilter,
        page: PageRequest,
    ) -> Result<(Vec<OperationLog>, u64), StoreError> {
        let admin = filter.admin_id.map(|id| *id.as_uuid());

        let filter_sql = r#"
              ($1::text IS NULL OR module = $1)
              AND ($2::text IS NULL OR action = $2)
              AND ($3::uuid IS NULL OR admin_id = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
        "#;

        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM operation_logs WHERE {filter_sql}"
        ))
        .bind(&filter.module)
        .bind(&filter.action)
        .bind(admin)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&mut *self.tx)
        .await?;
        let total: i64 = count_row.try_get("total")?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, admin_id, admin_name, module, action, target_type, target_id, detail, created_at
            FROM operation_logs
            WHERE {filter_sql}
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(&filter.module)
        .bind(&filter.action)
        .bind(admin)
        .bind(filter.from)
        .bind(filter.to)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut logs = Vec::with_capacity(rows.len());
        for row in rows {
            logs.push(OperationLogRow::from_row(&row)?.0);
        }
        Ok((logs, total as u64))
    }

    // ── transaction control ──────────────────────────────────────────────

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
