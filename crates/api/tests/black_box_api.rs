//! Black-box tests: spawn the real HTTP server on an ephemeral port and
//! drive it with a plain HTTP client. Every server runs on a fresh
//! in-memory store, so tests are independent.

use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        let app = bookmart_api::app::build_app(jwt_secret.to_string()).await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn admin_token(client: &reqwest::Client, base_url: &str) -> String {
    let res = client
        .post(format!("{base_url}/auth/admin/login"))
        .json(&json!({ "username": "admin", "password": "admin123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn register_and_login(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
) -> String {
    let res = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter42",
            "fullName": "A Reader",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(format!("{base_url}/auth/login"))
        .json(&json!({ "username": username, "password": "hunter42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_book(
    client: &reqwest::Client,
    base_url: &str,
    admin_token: &str,
    title: &str,
    price: &str,
    stock: i64,
) -> String {
    let res = client
        .post(format!("{base_url}/admin/books"))
        .bearer_auth(admin_token)
        .json(&json!({
            "isbn": format!("isbn-{title}"),
            "title": title,
            "author": "an author",
            "price": price,
            "stockQuantity": stock,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn("test-secret").await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn storefront_routes_require_a_token() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/cart", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], json!(false));

    let res = client
        .get(format!("{}/cart", srv.base_url))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    // Signed with a different secret; the claims themselves are well-formed.
    let token = mint_customer_jwt("wrong-secret", Uuid::now_v7());
    let res = client
        .get(format!("{}/profile", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // The same claims under the right secret pass authentication (the
    // unknown subject then reads as not found, not unauthorized).
    let token = mint_customer_jwt("test-secret", Uuid::now_v7());
    let res = client
        .get(format!("{}/profile", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customer_tokens_cannot_reach_admin_routes() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &srv.base_url, "reader").await;

    let res = client
        .get(format!("{}/admin/dashboard", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();
    register_and_login(&client, &srv.base_url, "reader").await;

    let res = client
        .post(format!("{}/auth/register", srv.base_url))
        .json(&json!({
            "username": "reader",
            "email": "other@example.com",
            "password": "hunter42",
            "fullName": "A Reader",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn full_purchase_flow() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let admin = admin_token(&client, &srv.base_url).await;
    let book_id = create_book(&client, &srv.base_url, &admin, "Dune", "19.90", 3).await;

    let token = register_and_login(&client, &srv.base_url, "reader").await;

    // Add two copies; the cart echoes derived totals.
    let res = client
        .post(format!("{}/cart/items", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "bookId": book_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cart: Value = res.json().await.unwrap();
    assert_eq!(cart["data"]["totalItems"], json!(2));
    assert_eq!(cart["data"]["totalAmount"], json!("39.80"));

    // Checkout.
    let res = client
        .post(format!("{}/orders", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "shippingAddress": "42 Main St" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    assert_eq!(order["data"]["status"], json!("pending"));
    assert_eq!(order["data"]["totalAmount"], json!("39.80"));
    assert_eq!(order["data"]["items"].as_array().unwrap().len(), 1);

    // Stock was decremented and the cart is empty again.
    let res = client
        .get(format!("{}/books/{book_id}", srv.base_url))
        .send()
        .await
        .unwrap();
    let book: Value = res.json().await.unwrap();
    assert_eq!(book["data"]["stockQuantity"], json!(1));

    let res = client
        .get(format!("{}/cart", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let cart: Value = res.json().await.unwrap();
    assert_eq!(cart["data"]["totalItems"], json!(0));

    // The order shows up in the history.
    let res = client
        .get(format!("{}/orders", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let history: Value = res.json().await.unwrap();
    assert_eq!(history["pagination"]["total"], json!(1));
}

#[tokio::test]
async fn oversell_is_rejected_with_a_client_error() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let admin = admin_token(&client, &srv.base_url).await;
    let book_id = create_book(&client, &srv.base_url, &admin, "Rare", "50.00", 1).await;

    let token = register_and_login(&client, &srv.base_url, "reader").await;
    let res = client
        .post(format!("{}/cart/items", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "bookId": book_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("insufficient stock"));
}

#[tokio::test]
async fn stock_adjustment_is_audited() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let admin = admin_token(&client, &srv.base_url).await;
    let book_id = create_book(&client, &srv.base_url, &admin, "Dune", "19.90", 10).await;

    let res = client
        .post(format!("{}/admin/books/{book_id}/stock", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "delta": 5, "remark": "restock" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["book"]["stockQuantity"], json!(15));
    assert_eq!(body["data"]["log"]["changeType"], json!("in"));

    // Both ledgers picked it up.
    let res = client
        .get(format!("{}/admin/stock-logs?bookId={book_id}", srv.base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let logs: Value = res.json().await.unwrap();
    assert_eq!(logs["pagination"]["total"], json!(1));
    assert_eq!(logs["data"][0]["delta"], json!(5));

    let res = client
        .get(format!(
            "{}/admin/operation-logs?module=inventory",
            srv.base_url
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let ops: Value = res.json().await.unwrap();
    assert_eq!(ops["pagination"]["total"], json!(1));
    assert_eq!(ops["data"][0]["action"], json!("adjust_stock"));
}

#[tokio::test]
async fn admin_roster_lists_accounts_without_password_hashes() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();
    let admin = admin_token(&client, &srv.base_url).await;

    let res = client
        .get(format!("{}/admin/admins", srv.base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["pagination"]["total"], json!(1));
    assert_eq!(body["data"][0]["username"], json!("admin"));
    assert!(body["data"][0].get("passwordHash").is_none());
    assert!(body["data"][0].get("password_hash").is_none());
}

#[tokio::test]
async fn order_status_follows_the_lifecycle() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let admin = admin_token(&client, &srv.base_url).await;
    let book_id = create_book(&client, &srv.base_url, &admin, "Dune", "19.90", 3).await;
    let token = register_and_login(&client, &srv.base_url, "reader").await;

    client
        .post(format!("{}/cart/items", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "bookId": book_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    let res = client
        .post(format!("{}/orders", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "shippingAddress": "42 Main St" }))
        .send()
        .await
        .unwrap();
    let order: Value = res.json().await.unwrap();
    let order_id = order["data"]["id"].as_str().unwrap().to_string();

    // pending -> shipped is illegal.
    let res = client
        .put(format!("{}/admin/orders/{order_id}/status", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // pending -> paid is fine.
    let res = client
        .put(format!("{}/admin/orders/{order_id}/status", srv.base_url))
        .bearer_auth(&admin)
        .json(&json!({ "status": "paid" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], json!("paid"));

    // The dashboard now counts the paid order in monthly revenue.
    let res = client
        .get(format!("{}/admin/dashboard", srv.base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let stats: Value = res.json().await.unwrap();
    assert_eq!(stats["data"]["totalOrders"], json!(1));
    assert_eq!(stats["data"]["monthlyRevenue"], json!("19.90"));
}

fn mint_customer_jwt(secret: &str, sub: Uuid) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = json!({
        "sub": sub,
        "kind": "customer",
        "permissions": [],
        "issued_at": now,
        "expires_at": now + chrono::Duration::hours(1),
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
