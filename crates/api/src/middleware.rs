use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use bookmart_auth::{Claims, JwtValidator, PrincipalKind};
use bookmart_core::{AdminId, UserId};

use crate::app::errors::json_error;
use crate::context::{AdminContext, CustomerContext};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Storefront guard: requires a valid customer token.
pub async fn customer_auth(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = authenticate(&state, req.headers())?;
    if claims.kind != PrincipalKind::Customer {
        return Err(json_error(
            StatusCode::FORBIDDEN,
            "admin tokens are not valid on storefront routes",
        ));
    }

    req.extensions_mut()
        .insert(CustomerContext::new(UserId::from(claims.sub)));

    Ok(next.run(req).await)
}

/// Back-office guard: requires a valid admin token. Per-route permission
/// checks happen in the handlers.
pub async fn admin_auth(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = authenticate(&state, req.headers())?;
    if claims.kind != PrincipalKind::Admin {
        return Err(json_error(
            StatusCode::FORBIDDEN,
            "admin token required",
        ));
    }

    req.extensions_mut().insert(AdminContext::new(
        AdminId::from(claims.sub),
        claims.permissions.clone(),
    ));

    Ok(next.run(req).await)
}

fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<Claims, Response> {
    let token = extract_bearer(headers)?;
    state
        .jwt
        .validate(token, Utc::now())
        .map_err(|_| json_error(StatusCode::UNAUTHORIZED, "invalid or expired token"))
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

    let header = header
        .to_str()
        .map_err(|_| json_error(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "missing bearer token"))?
        .trim();

    if token.is_empty() {
        return Err(json_error(StatusCode::UNAUTHORIZED, "missing bearer token"));
    }

    Ok(token)
}
