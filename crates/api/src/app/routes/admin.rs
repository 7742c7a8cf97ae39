//! Back-office endpoints. Every handler names the permission it needs; the
//! service layer writes the operation log inside the same transaction as
//! the change.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde_json::json;

use bookmart_core::{BookId, OrderId, UserId};
use bookmart_infra::services::AdminActor;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::AdminContext;

/// Resolve the acting admin for the audit trail. A token whose subject no
/// longer exists is treated as unauthorized.
async fn actor(
    services: &AppServices,
    admin: &AdminContext,
) -> Result<AdminActor, axum::response::Response> {
    services
        .admin
        .actor(admin.admin_id())
        .await
        .map_err(errors::domain_error_to_response)
}

// ── dashboard ────────────────────────────────────────────────────────────

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "dashboard.read") {
        return resp;
    }
    match services.admin.dashboard_stats().await {
        Ok(stats) => dto::ok(json!(stats)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── admins ───────────────────────────────────────────────────────────────

pub async fn list_admins(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "admins.read") {
        return resp;
    }
    match services.admin.list_admins(query.page_request()).await {
        Ok(page) => dto::page(page.map(|a| dto::admin_json(&a))),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── users ────────────────────────────────────────────────────────────────

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Query(query): Query<dto::UserListQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "users.read") {
        return resp;
    }
    let (filter, page) = query.into_filter();
    match services.admin.list_users(&filter, page).await {
        Ok(page) => dto::page(page.map(|u| dto::user_json(&u))),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn set_user_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetUserStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "users.write") {
        return resp;
    }
    let user_id: UserId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = match actor(&services, &admin).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services
        .admin
        .set_user_status(&actor, user_id, body.active)
        .await
    {
        Ok(user) => dto::ok(dto::user_json(&user)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── catalog ──────────────────────────────────────────────────────────────

pub async fn list_books(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Query(query): Query<dto::BookQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "books.read") {
        return resp;
    }
    let params = query.into_params();
    let page = params.page.unwrap_or_default();
    match services.admin.list_books(&params, page).await {
        Ok(page) => dto::page(page.map(|b| dto::book_json(&b))),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Json(body): Json<dto::CreateBookRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "books.write") {
        return resp;
    }
    let draft = match body.into_draft() {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let actor = match actor(&services, &admin).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services.admin.create_book(&actor, draft).await {
        Ok(book) => dto::created(dto::book_json(&book)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateBookRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "books.write") {
        return resp;
    }
    let book_id: BookId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match body.into_patch() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let actor = match actor(&services, &admin).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services.admin.update_book(&actor, book_id, patch).await {
        Ok(book) => dto::ok(dto::book_json(&book)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "books.write") {
        return resp;
    }
    let book_id: BookId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = match actor(&services, &admin).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services.admin.delete_book(&actor, book_id).await {
        Ok(()) => dto::message("book deleted"),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Json(body): Json<dto::CreateCategoryRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "books.write") {
        return resp;
    }
    let actor = match actor(&services, &admin).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services.admin.create_category(&actor, body.name).await {
        Ok(category) => dto::created(dto::category_json(&category)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── inventory ────────────────────────────────────────────────────────────

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "inventory.adjust") {
        return resp;
    }
    let book_id: BookId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = match actor(&services, &admin).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services
        .admin
        .adjust_stock(&actor, book_id, body.delta, body.remark)
        .await
    {
        Ok(adjustment) => dto::ok(json!({
            "book": dto::book_json(&adjustment.book),
            "log": dto::stock_log_json(&adjustment.log),
        })),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn stock_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Query(query): Query<dto::StockLogQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "inventory.read") {
        return resp;
    }
    let page = bookmart_core::PageRequest::new(
        query.page.unwrap_or(1),
        query
            .page_size
            .unwrap_or(bookmart_core::PageRequest::DEFAULT_PAGE_SIZE),
    );
    let book_id = query.book_id.map(BookId::from);
    match services.admin.stock_logs(book_id, page).await {
        Ok(page) => dto::page(page.map(|l| dto::stock_log_json(&l))),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── orders ───────────────────────────────────────────────────────────────

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Query(query): Query<dto::OrderListQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "orders.read") {
        return resp;
    }
    let (filter, page) = match query.into_filter() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.admin.list_orders(&filter, page).await {
        Ok(page) => dto::page(page.map(|o| dto::order_json(&o))),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "orders.write") {
        return resp;
    }
    let order_id: OrderId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let next = match errors::parse_order_status(&body.status) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let actor = match actor(&services, &admin).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match services
        .admin
        .update_order_status(&actor, order_id, next)
        .await
    {
        Ok(order) => dto::ok(dto::order_json(&order)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ── audit ────────────────────────────────────────────────────────────────

pub async fn operation_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Query(query): Query<dto::OperationLogQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&admin, "audit.read") {
        return resp;
    }
    let (filter, page) = query.into_filter();
    match services.admin.operation_logs(&filter, page).await {
        Ok(page) => dto::page(page.map(|l| dto::operation_log_json(&l))),
        Err(e) => errors::domain_error_to_response(e),
    }
}
