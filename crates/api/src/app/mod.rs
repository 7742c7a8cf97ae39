//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(jwt_secret: String) -> Router {
    let jwt = Arc::new(bookmart_auth::Hs256Jwt::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt: jwt.clone() };

    let services = Arc::new(services::build_services(jwt).await);

    let storefront = routes::customer_router().layer(axum::middleware::from_fn_with_state(
        auth_state.clone(),
        middleware::customer_auth,
    ));

    let back_office = routes::admin_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::admin_auth,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router())
        .merge(storefront)
        .nest("/admin", back_office)
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
