//! Shopping cart endpoints. Every handler responds with the full cart view
//! so the client never has to stitch partial updates together.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};

use bookmart_core::{BookId, CartLineId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CustomerContext;

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> axum::response::Response {
    match services.carts.get_cart(customer.user_id()).await {
        Ok(cart) => dto::ok(dto::cart_json(&cart)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Json(body): Json<dto::AddToCartRequest>,
) -> axum::response::Response {
    match services
        .carts
        .add_to_cart(customer.user_id(), BookId::from(body.book_id), body.quantity)
        .await
    {
        Ok(cart) => dto::ok(dto::cart_json(&cart)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateCartItemRequest>,
) -> axum::response::Response {
    let line_id: CartLineId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .carts
        .update_cart_item(customer.user_id(), line_id, body.quantity)
        .await
    {
        Ok(cart) => dto::ok(dto::cart_json(&cart)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let line_id: CartLineId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .carts
        .remove_cart_item(customer.user_id(), line_id)
        .await
    {
        Ok(cart) => dto::ok(dto::cart_json(&cart)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn clear(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> axum::response::Response {
    match services.carts.clear_cart(customer.user_id()).await {
        Ok(cart) => dto::ok(dto::cart_json(&cart)),
        Err(e) => errors::domain_error_to_response(e),
    }
}
