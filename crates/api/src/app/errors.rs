use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use uuid::Uuid;

use bookmart_core::DomainError;
use bookmart_orders::OrderStatus;

/// Map a domain failure onto the HTTP envelope. Datastore failures are
/// logged server-side; the client only ever sees a generic message.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    use DomainError::*;
    match &err {
        BookNotFound | CartNotFound | ItemNotFound | OrderNotFound | UserNotFound => {
            json_error(StatusCode::NOT_FOUND, err.to_string())
        }
        EmptyCart | InsufficientStock(_) | BookUnavailable(_) | Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        Conflict(_) => json_error(StatusCode::CONFLICT, err.to_string()),
        Unauthorized => json_error(StatusCode::UNAUTHORIZED, "invalid credentials"),
        Store(msg) => {
            tracing::error!(error = %msg, "datastore failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path segment into a uuid-backed id.
pub fn parse_id<T: From<Uuid>>(s: &str) -> Result<T, axum::response::Response> {
    s.parse::<Uuid>()
        .map(T::from)
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid id"))
}

pub fn parse_order_status(s: &str) -> Result<OrderStatus, axum::response::Response> {
    s.parse().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "status must be one of: pending, paid, shipped, delivered, cancelled",
        )
    })
}
