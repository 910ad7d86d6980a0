//! Router test harness over the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

use crate::models::catalog::Catalog;
use crate::routes::create_app;
use crate::state::AppState;
use crate::store::memory::MemoryStore;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// bcrypt's minimum cost keeps hashing fast in tests.
const TEST_BCRYPT_COST: u32 = 4;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mouse_id: i64,
    pub headphones_id: i64,
    pub laptop_id: i64,
    pub takealot_id: i64,
    pub amazon_id: i64,
}

/// Three products, two retailers, four offers:
///
/// | product           | brand    | category    | retailer | final |
/// |-------------------|----------|-------------|----------|-------|
/// | Wireless Mouse    | Logitech | Peripherals | Takealot | 349   |
/// | Wireless Mouse    | Logitech | Peripherals | Amazon   | 379   |
/// | Studio Headphones | Sony     | Audio       | Amazon   | 899   |
/// | XPS Laptop        | Dell     | Laptops     | Takealot | 2499  |
pub async fn seeded_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());

    let logitech = store.add_named(Catalog::Brands, "Logitech").await;
    let sony = store.add_named(Catalog::Brands, "Sony").await;
    let dell = store.add_named(Catalog::Brands, "Dell").await;
    let peripherals = store.add_named(Catalog::Categories, "Peripherals").await;
    let audio = store.add_named(Catalog::Categories, "Audio").await;
    let laptops = store.add_named(Catalog::Categories, "Laptops").await;
    let takealot_id = store.add_named(Catalog::Retailers, "Takealot").await;
    let amazon_id = store.add_named(Catalog::Retailers, "Amazon").await;

    let mouse_id = store.add_product("Wireless Mouse", Some(logitech), Some(peripherals)).await;
    let headphones_id = store.add_product("Studio Headphones", Some(sony), Some(audio)).await;
    let laptop_id = store.add_product("XPS Laptop", Some(dell), Some(laptops)).await;

    store.add_offer(mouse_id, takealot_id, 399.0, 349.0).await;
    store.add_offer(mouse_id, amazon_id, 399.0, 379.0).await;
    store.add_offer(headphones_id, amazon_id, 1099.0, 899.0).await;
    store.add_offer(laptop_id, takealot_id, 2999.0, 2499.0).await;

    let state = AppState::new(store.clone(), TEST_BCRYPT_COST);
    let router = create_app(state, CorsLayer::new());

    TestApp {
        router,
        store,
        mouse_id,
        headphones_id,
        laptop_id,
        takealot_id,
        amazon_id,
    }
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestUser {
    /// Registers through the API, then logs in for the key.
    pub async fn register(app: &TestApp, email: &str, role: &str) -> TestUser {
        let (status, body) = post_json(
            &app.router,
            "/User/Register",
            json!({
                "first_name": "Test",
                "last_name": "User",
                "email": email,
                "password": TEST_PASSWORD,
                "role": role,
            }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "register {email}: {body}");

        let (status, body) = post_json(
            &app.router,
            "/User/Login",
            json!({ "email": email, "password": TEST_PASSWORD }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login {email}: {body}");

        TestUser {
            id: body["data"]["user"]["id"].as_i64().unwrap(),
            token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }
}

pub async fn post_json(
    router: &Router,
    uri: &str,
    body: Value,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    send(router, request).await
}

/// POST with an arbitrary body and optional content type.
pub async fn post_raw(
    router: &Router,
    uri: &str,
    body: &str,
    content_type: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    send(router, request).await
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
