//! Registration, login and profile endpoints. Login handlers are the only
//! place tokens are minted.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use chrono::Utc;
use serde_json::json;

use bookmart_auth::PrincipalKind;
use bookmart_infra::services::RegisterUser;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CustomerContext;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let input = RegisterUser {
        username: body.username,
        email: body.email,
        password: body.password,
        full_name: body.full_name,
        phone: body.phone,
    };
    match services.users.register(input).await {
        Ok(user) => dto::created(dto::user_json(&user)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let user = match services.users.login(&body.username, &body.password).await {
        Ok(user) => user,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let token = match services.jwt.issue(
        user.id.into(),
        PrincipalKind::Customer,
        Vec::new(),
        Utc::now(),
    ) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "token issuing failed");
            return errors::json_error(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            );
        }
    };

    dto::ok(json!({
        "token": token,
        "user": dto::user_json(&user),
    }))
}

pub async fn admin_login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let admin = match services.admin.login(&body.username, &body.password).await {
        Ok(admin) => admin,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let token = match services.jwt.issue(
        admin.id.into(),
        PrincipalKind::Admin,
        admin.permissions.clone(),
        Utc::now(),
    ) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "token issuing failed");
            return errors::json_error(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            );
        }
    };

    dto::ok(json!({
        "token": token,
        "admin": dto::admin_json(&admin),
    }))
}

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> axum::response::Response {
    match services.users.get_user(customer.user_id()).await {
        Ok(user) => dto::ok(dto::user_json(&user)),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Json(body): Json<dto::UpdateProfileRequest>,
) -> axum::response::Response {
    match services
        .users
        .update_profile(customer.user_id(), body.into_patch())
        .await
    {
        Ok(user) => dto::ok(dto::user_json(&user)),
        Err(e) => errors::domain_error_to_response(e),
    }
}
