//! Public catalog endpoints: search, detail, featured list, categories.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use serde_json::json;

use bookmart_core::BookId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const FEATURED_DEFAULT_LIMIT: usize = 10;

pub async fn search(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::BookQuery>,
) -> axum::response::Response {
    let params = query.into_params();
    match services.books.search_books(&params).await {
        Ok(page) => dto::page(page.map(|b| dto::book_json(&b))),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let book_id: BookId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.books.get_book(book_id).await {
        Ok(details) => dto::ok(dto::book_details_json(&details)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn featured(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::FeaturedQuery>,
) -> axum::response::Response {
    let limit = query.limit.unwrap_or(FEATURED_DEFAULT_LIMIT);
    match services.books.featured_books(limit).await {
        Ok(books) => dto::ok(json!(books
            .iter()
            .map(dto::book_json)
            .collect::<Vec<_>>())),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.books.list_categories().await {
        Ok(categories) => dto::ok(json!(categories
            .iter()
            .map(dto::category_json)
            .collect::<Vec<_>>())),
        Err(e) => errors::domain_error_to_response(e),
    }
}
