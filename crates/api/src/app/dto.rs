//! Request DTOs, JSON mapping and the response envelope.
//!
//! Every response carries `{"success": bool, ...}`; list endpoints add a
//! `pagination` block. Domain types never serialize straight onto the wire
//! here so the JSON stays camelCase and `password_hash` never leaves the
//! server.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use bookmart_auth::{Admin, User};
use bookmart_cart::CartView;
use bookmart_catalog::{Book, BookDraft, BookPatch, BookSearchParams, Category};
use bookmart_core::{CategoryId, DomainError, Money, PageRequest, Paginated, UserId};
use bookmart_infra::services::BookDetails;
use bookmart_infra::store::records::{
    OperationLog, OperationLogFilter, OrderListFilter, UserListFilter,
};
use bookmart_inventory::{StockChangeType, StockLog, StockOperator};
use bookmart_orders::{Order, OrderWithLines};

// ── requests ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl UpdateProfileRequest {
    pub fn into_patch(self) -> bookmart_auth::UserProfilePatch {
        bookmart_auth::UserProfilePatch {
            full_name: self.full_name,
            phone: self.phone,
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub book_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<Uuid>,
}

impl CreateBookRequest {
    pub fn into_draft(self) -> Result<BookDraft, DomainError> {
        Ok(BookDraft {
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            price: Money::new(self.price)?,
            stock_quantity: self.stock_quantity,
            description: self.description,
            cover_image: self.cover_image,
            category_id: self.category_id.map(CategoryId::from),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: Option<bookmart_catalog::BookStatus>,
}

impl UpdateBookRequest {
    pub fn into_patch(self) -> Result<BookPatch, DomainError> {
        Ok(BookPatch {
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            price: self.price.map(Money::new).transpose()?,
            description: self.description,
            cover_image: self.cover_image,
            category_id: self.category_id.map(CategoryId::from),
            status: self.status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SetUserStatusRequest {
    pub active: bool,
}

// ── query strings ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    pub keyword: Option<String>,
    pub category_id: Option<Uuid>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl BookQuery {
    pub fn into_params(self) -> BookSearchParams {
        let page = PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
        );
        BookSearchParams {
            keyword: self.keyword,
            category_id: self.category_id.map(CategoryId::from),
            author: self.author,
            isbn: self.isbn,
            page: Some(page),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub keyword: Option<String>,
    pub active_only: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl UserListQuery {
    pub fn into_filter(self) -> (UserListFilter, PageRequest) {
        let page = PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
        );
        (
            UserListFilter {
                keyword: self.keyword,
                active_only: self.active_only,
            },
            page,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl OrderListQuery {
    pub fn into_filter(self) -> Result<(OrderListFilter, PageRequest), DomainError> {
        let status = self.status.as_deref().map(str::parse).transpose()?;
        let page = PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
        );
        Ok((
            OrderListFilter {
                status,
                user_id: self.user_id.map(UserId::from),
                from: self.from,
                to: self.to,
            },
            page,
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLogQuery {
    pub book_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLogQuery {
    pub module: Option<String>,
    pub action: Option<String>,
    pub admin_id: Option<Uuid>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl OperationLogQuery {
    pub fn into_filter(self) -> (OperationLogFilter, PageRequest) {
        let page = PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(PageRequest::DEFAULT_PAGE_SIZE),
        );
        (
            OperationLogFilter {
                module: self.module,
                action: self.action,
                admin_id: self.admin_id.map(Into::into),
                from: self.from,
                to: self.to,
            },
            page,
        )
    }
}

// ── response envelope ────────────────────────────────────────────────────

pub fn ok(data: Value) -> axum::response::Response {
    (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response()
}

pub fn created(data: Value) -> axum::response::Response {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": data })),
    )
        .into_response()
}

pub fn message(msg: &str) -> axum::response::Response {
    (StatusCode::OK, Json(json!({ "success": true, "message": msg }))).into_response()
}

pub fn page(paginated: Paginated<Value>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": paginated.data,
            "pagination": paginated.pagination,
        })),
    )
        .into_response()
}

// ── JSON mapping ─────────────────────────────────────────────────────────

/// Public view of an account. The password hash never leaves the server.
pub fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "fullName": user.full_name,
        "phone": user.phone,
        "address": user.address,
        "city": user.city,
        "postalCode": user.postal_code,
        "status": user.status,
        "createdAt": user.created_at,
    })
}

pub fn admin_json(admin: &Admin) -> Value {
    json!({
        "id": admin.id,
        "username": admin.username,
        "fullName": admin.full_name,
        "permissions": admin.permissions,
        "status": admin.status,
        "lastLoginAt": admin.last_login_at,
        "createdAt": admin.created_at,
    })
}

pub fn book_json(book: &Book) -> Value {
    json!({
        "id": book.id,
        "isbn": book.isbn,
        "title": book.title,
        "author": book.author,
        "publisher": book.publisher,
        "price": book.price,
        "stockQuantity": book.stock_quantity,
        "salesCount": book.sales_count,
        "description": book.description,
        "coverImage": book.cover_image,
        "categoryId": book.category_id,
        "status": book.status,
        "createdAt": book.created_at,
    })
}

pub fn book_details_json(details: &BookDetails) -> Value {
    let mut value = book_json(&details.book);
    value["categoryName"] = json!(details.category.as_ref().map(|c| c.name.clone()));
    value
}

pub fn category_json(category: &Category) -> Value {
    json!({
        "id": category.id,
        "name": category.name,
    })
}

pub fn cart_json(cart: &CartView) -> Value {
    let lines: Vec<Value> = cart
        .lines
        .iter()
        .map(|l| {
            json!({
                "id": l.line.id,
                "bookId": l.book.id,
                "title": l.book.title,
                "price": l.book.price,
                "quantity": l.line.quantity,
                "lineTotal": l.line_total(),
                "addedAt": l.line.added_at,
            })
        })
        .collect();
    json!({
        "id": cart.id,
        "items": lines,
        "totalItems": cart.total_items(),
        "totalAmount": cart.total_amount(),
    })
}

pub fn order_json(order: &Order) -> Value {
    json!({
        "id": order.id,
        "userId": order.user_id,
        "totalAmount": order.total_amount,
        "status": order.status,
        "shippingAddress": order.shipping_address,
        "orderDate": order.order_date,
    })
}

pub fn order_with_lines_json(order: &OrderWithLines) -> Value {
    let lines: Vec<Value> = order
        .lines
        .iter()
        .map(|l| {
            json!({
                "id": l.id,
                "bookId": l.book_id,
                "bookTitle": l.book_title,
                "quantity": l.quantity,
                "unitPrice": l.unit_price,
                "lineTotal": l.line_total(),
            })
        })
        .collect();
    let mut value = order_json(&order.order);
    value["items"] = Value::Array(lines);
    value
}

pub fn stock_log_json(log: &StockLog) -> Value {
    let (operator_kind, operator_id) = match &log.operator {
        StockOperator::System => ("system", None),
        StockOperator::Admin(id) => ("admin", Some(*id)),
    };
    json!({
        "id": log.id,
        "bookId": log.book_id,
        "changeType": match log.change_type {
            StockChangeType::Sale => "sale",
            StockChangeType::In => "in",
            StockChangeType::Out => "out",
        },
        "beforeQuantity": log.before_quantity,
        "afterQuantity": log.after_quantity,
        "delta": log.delta,
        "relatedOrderId": log.related_order_id,
        "operatorKind": operator_kind,
        "operatorId": operator_id,
        "remark": log.remark,
        "createdAt": log.created_at,
    })
}

pub fn operation_log_json(log: &OperationLog) -> Value {
    json!({
        "id": log.id,
        "adminId": log.admin_id,
        "adminName": log.admin_name,
        "module": log.module,
        "action": log.action,
        "targetType": log.target_type,
        "targetId": log.target_id,
        "detail": log.detail,
        "createdAt": log.created_at,
    })
}
