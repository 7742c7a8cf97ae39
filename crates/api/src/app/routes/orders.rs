//! Storefront order endpoints: checkout and order history.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};

use bookmart_core::OrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CustomerContext;

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Json(body): Json<dto::CheckoutRequest>,
) -> axum::response::Response {
    match services
        .checkout
        .checkout(customer.user_id(), body.shipping_address)
        .await
    {
        Ok(order) => dto::created(dto::order_with_lines_json(&order)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    match services
        .orders
        .get_user_orders(customer.user_id(), query.page_request())
        .await
    {
        Ok(page) => dto::page(page.map(|o| dto::order_with_lines_json(&o))),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .orders
        .get_order(order_id, Some(customer.user_id()))
        .await
    {
        Ok(order) => dto::ok(dto::order_with_lines_json(&order)),
        Err(e) => errors::domain_error_to_response(e),
    }
}
