//! Per-route permission guard for back-office endpoints.
//!
//! The auth middleware only establishes that the caller holds an admin token;
//! each handler names the permission it needs before touching a service.

use axum::http::StatusCode;
use axum::response::Response;

use bookmart_auth::Permission;

use crate::app::errors::json_error;
use crate::context::AdminContext;

/// Check that the acting admin holds `permission` (or the wildcard grant).
pub fn require(admin: &AdminContext, permission: &str) -> Result<(), Response> {
    let required = Permission::new(permission.to_string());
    if admin.allows(&required) {
        return Ok(());
    }
    Err(json_error(
        StatusCode::FORBIDDEN,
        format!("missing permission: {permission}"),
    ))
}
