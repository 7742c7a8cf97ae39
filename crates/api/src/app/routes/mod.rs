use axum::{
    routing::{get, post, put},
    Router,
};

pub mod admin;
pub mod auth;
pub mod books;
pub mod cart;
pub mod orders;
pub mod system;

/// Routes reachable without a token: registration, login and the catalog.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/admin/login", post(auth::admin_login))
        .route("/books", get(books::search))
        .route("/books/featured", get(books::featured))
        .route("/books/:id", get(books::get))
        .route("/categories", get(books::categories))
}

/// Storefront routes behind customer authentication.
pub fn customer_router() -> Router {
    Router::new()
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/cart", get(cart::get).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/:id",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/orders", post(orders::checkout).get(orders::list))
        .route("/orders/:id", get(orders::get))
}

/// Back-office routes, nested under `/admin` behind admin authentication.
pub fn admin_router() -> Router {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/admins", get(admin::list_admins))
        .route("/users", get(admin::list_users))
        .route("/users/:id/status", put(admin::set_user_status))
        .route("/books", get(admin::list_books).post(admin::create_book))
        .route(
            "/books/:id",
            put(admin::update_book).delete(admin::delete_book),
        )
        .route("/books/:id/stock", post(admin::adjust_stock))
        .route("/categories", post(admin::create_category))
        .route("/stock-logs", get(admin::stock_logs))
        .route("/orders", get(admin::list_orders))
        .route("/orders/:id/status", put(admin::update_order_status))
        .route("/operation-logs", get(admin::operation_logs))
}
