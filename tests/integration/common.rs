//! Shared helpers: an in-memory app driven through the router

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use libris_server::{
    api,
    config::{AppConfig, AuthConfig},
    repository::Repository,
    AppState,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "adminpass";

pub struct TestApp {
    router: Router,
}

impl TestApp {
    /// Fresh in-memory app with a staff account already present
    pub async fn new() -> Self {
        let config = AppConfig {
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                bootstrap_admin_email: Some(ADMIN_EMAIL.to_string()),
                bootstrap_admin_password: Some(ADMIN_PASSWORD.to_string()),
                ..AuthConfig::default()
            },
            ..AppConfig::default()
        };
        let state = AppState::new(config, Repository::in_memory());
        state
            .services
            .users
            .ensure_bootstrap_admin()
            .await
            .expect("bootstrap admin");

        Self {
            router: api::router(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register an account and return its access token and id
    pub async fn signup(&self, email: &str) -> (String, i64) {
        let (status, user) = self
            .post(
                "/api/v1/users",
                None,
                json!({ "email": email, "password": "secret123" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{user}");
        let token = self.login(email, "secret123").await;
        (token, user["id"].as_i64().expect("id"))
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/users/token",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access"].as_str().expect("access token").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Create a book as staff and return its id
    pub async fn add_book(&self, title: &str, inventory: i32) -> i64 {
        let admin = self.admin_token().await;
        let (status, book) = self
            .post(
                "/api/v1/books",
                Some(&admin),
                json!({
                    "title": title,
                    "author": "Test Author",
                    "inventory": inventory,
                    "daily_fee": "6.00"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{book}");
        book["id"].as_i64().expect("id")
    }

    pub async fn inventory(&self, book_id: i64) -> i64 {
        let (_, book) = self.get(&format!("/api/v1/books/{book_id}"), None).await;
        book["inventory"].as_i64().expect("inventory")
    }
}

pub fn borrow_body(book_id: i64) -> Value {
    json!({
        "book": book_id,
        "borrow_date": "2024-03-01",
        "expected_return_date": "2024-03-08"
    })
}
