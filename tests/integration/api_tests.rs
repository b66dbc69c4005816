//! API integration tests over the in-memory backend

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{borrow_body, TestApp};

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Libris API");
    assert!(body["paths"]["/borrowings/{id}/return"].is_object());
}

#[tokio::test]
async fn test_book_permissions() {
    let app = TestApp::new().await;
    let (reader, _) = app.signup("reader@example.com").await;
    let new_book = json!({
        "title": "Dune",
        "author": "Frank Herbert",
        "inventory": 2,
        "daily_fee": "1.50"
    });

    let (status, body) = app.post("/api/v1/books", None, new_book.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationError");

    let (status, body) = app.post("/api/v1/books", Some(&reader), new_book.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "AuthorizationError");

    let admin = app.admin_token().await;
    let (status, book) = app.post("/api/v1/books", Some(&admin), new_book).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["cover"], "Hard");
    assert_eq!(book["daily_fee"], "1.50");

    let (status, books) = app.get("/api/v1/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().map(Vec::len), Some(1));

    let uri = format!("/api/v1/books/{}", book["id"]);
    let (status, _) = app.request(Method::DELETE, &uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_book_update_and_delete() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let id = app.add_book("Old Title", 1).await;
    let uri = format!("/api/v1/books/{id}");

    let (status, book) = app
        .request(Method::PATCH, &uri, Some(&admin), Some(json!({ "cover": "Soft" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["cover"], "Soft");
    assert_eq!(book["title"], "Old Title");

    let replacement = json!({
        "title": "New Title",
        "author": "Someone Else",
        "inventory": 4,
        "daily_fee": "2.00"
    });
    let (status, book) = app
        .request(Method::PUT, &uri, Some(&admin), Some(replacement))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["title"], "New Title");
    assert_eq!(book["cover"], "Hard");
    assert_eq!(book["inventory"], 4);

    let (status, body) = app
        .request(Method::PATCH, &uri, Some(&admin), Some(json!({ "inventory": -1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (status, _) = app.request(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_borrow_and_return_cycle() {
    let app = TestApp::new().await;
    let (reader, reader_id) = app.signup("reader@example.com").await;
    let book_id = app.add_book("Test Title", 3).await;

    let (status, borrowing) = app
        .post("/api/v1/borrowings", Some(&reader), borrow_body(book_id))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{borrowing}");
    assert!(borrowing["actual_return_date"].is_null());
    assert_eq!(borrowing["user_id"], reader_id);
    assert_eq!(app.inventory(book_id).await, 2);

    let return_uri = format!("/api/v1/borrowings/{}/return", borrowing["id"]);
    let (status, body) = app.post(&return_uri, Some(&reader), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Book returned!");
    assert!(body["borrowing"]["actual_return_date"].is_string());
    assert_eq!(app.inventory(book_id).await, 3);

    let (status, body) = app.post(&return_uri, Some(&reader), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This borrowing has already been returned.");
    assert_eq!(app.inventory(book_id).await, 3);
}

#[tokio::test]
async fn test_borrow_without_inventory() {
    let app = TestApp::new().await;
    let (reader, _) = app.signup("reader@example.com").await;
    let book_id = app.add_book("Sold Out", 0).await;

    let (status, body) = app
        .post("/api/v1/borrowings", Some(&reader), borrow_body(book_id))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert_eq!(body["message"], "No books left in inventory");
    assert_eq!(app.inventory(book_id).await, 0);

    let (_, mine) = app.get("/api/v1/borrowings", Some(&reader)).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_borrowing_requires_authentication() {
    let app = TestApp::new().await;
    let book_id = app.add_book("Test Title", 1).await;

    let (status, _) = app.post("/api/v1/borrowings", None, borrow_body(book_id)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/borrowings", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.inventory(book_id).await, 1);
}

#[tokio::test]
async fn test_borrowing_visibility() {
    let app = TestApp::new().await;
    let (alice, alice_id) = app.signup("alice@example.com").await;
    let (bob, bob_id) = app.signup("bob@example.com").await;
    let book_id = app.add_book("Shared", 5).await;

    let (_, alice_borrowing) = app
        .post("/api/v1/borrowings", Some(&alice), borrow_body(book_id))
        .await;
    app.post("/api/v1/borrowings", Some(&bob), borrow_body(book_id)).await;

    // user_id is ignored for regular users
    let (status, rows) = app
        .get(&format!("/api/v1/borrowings?user_id={bob_id}"), Some(&alice))
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user"], alice_id);
    assert_eq!(rows[0]["book"], "Shared");

    // Someone else's borrowing looks like it does not exist
    let uri = format!("/api/v1/borrowings/{}", alice_borrowing["id"]);
    let (status, _) = app.get(&uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post(&format!("{uri}/return"), Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.inventory(book_id).await, 3);

    let (status, details) = app.get(&uri, Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["book"]["title"], "Shared");
    assert_eq!(details["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_staff_filters() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (alice, _) = app.signup("alice@example.com").await;
    let (bob, bob_id) = app.signup("bob@example.com").await;
    let book_id = app.add_book("Shared", 5).await;

    let (_, returned) = app
        .post("/api/v1/borrowings", Some(&alice), borrow_body(book_id))
        .await;
    app.post("/api/v1/borrowings", Some(&bob), borrow_body(book_id)).await;
    app.post(
        &format!("/api/v1/borrowings/{}/return", returned["id"]),
        Some(&alice),
        json!({}),
    )
    .await;

    let (_, all) = app.get("/api/v1/borrowings", Some(&admin)).await;
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let (_, active) = app.get("/api/v1/borrowings?is_active=True", Some(&admin)).await;
    let active = active.as_array().cloned().unwrap_or_default();
    assert_eq!(active.len(), 1);
    assert!(active[0]["actual_return_date"].is_null());

    let (_, done) = app.get("/api/v1/borrowings?is_active=false", Some(&admin)).await;
    let done = done.as_array().cloned().unwrap_or_default();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0]["id"], returned["id"]);

    let (_, bobs) = app
        .get(&format!("/api/v1/borrowings?user_id={bob_id}"), Some(&admin))
        .await;
    assert_eq!(bobs.as_array().map(Vec::len), Some(1));

    // Staff can return on behalf of a user
    let bob_row = &bobs[0];
    let (status, _) = app
        .post(
            &format!("/api/v1/borrowings/{}/return", bob_row["id"]),
            Some(&admin),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.inventory(book_id).await, 5);
}

#[tokio::test]
async fn test_register_and_profile() {
    let app = TestApp::new().await;

    let (status, user) = app
        .post(
            "/api/v1/users",
            None,
            json!({ "email": "reader@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "reader@example.com");
    assert!(user.get("password").is_none());
    assert_eq!(user["is_staff"], false);

    let (status, body) = app
        .post(
            "/api/v1/users",
            None,
            json!({ "email": "short@example.com", "password": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (status, _) = app
        .post(
            "/api/v1/users",
            None,
            json!({ "email": "reader@example.com", "password": "another" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/v1/users/token",
            None,
            json!({ "email": "reader@example.com", "password": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login("reader@example.com", "secret123").await;
    let (status, me) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);

    let (status, me) = app
        .request(
            Method::PATCH,
            "/api/v1/users/me",
            Some(&token),
            Some(json!({ "email": "renamed@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "renamed@example.com");
    app.login("renamed@example.com", "secret123").await;
}

#[tokio::test]
async fn test_token_refresh_and_verify() {
    let app = TestApp::new().await;
    app.signup("reader@example.com").await;

    let (_, pair) = app
        .post(
            "/api/v1/users/token",
            None,
            json!({ "email": "reader@example.com", "password": "secret123" }),
        )
        .await;
    let refresh = pair["refresh"].as_str().unwrap_or_default().to_string();

    let (status, _) = app
        .post("/api/v1/users/token/verify", None, json!({ "token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/v1/users/token/verify", None, json!({ "token": "nonsense" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A refresh token is not accepted as a bearer credential
    let (status, _) = app.get("/api/v1/users/me", Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, renewed) = app
        .post("/api/v1/users/token/refresh", None, json!({ "refresh": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = renewed["access"].as_str().unwrap_or_default();
    let (status, _) = app.get("/api/v1/users/me", Some(access)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/api/v1/books")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .expect("request");
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationError");
}

#[tokio::test]
async fn test_unusable_user_id_filter_is_ignored() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (alice, alice_id) = app.signup("alice@example.com").await;
    let (bob, _) = app.signup("bob@example.com").await;
    let book_id = app.add_book("Shared", 5).await;
    app.post("/api/v1/borrowings", Some(&alice), borrow_body(book_id)).await;
    app.post("/api/v1/borrowings", Some(&bob), borrow_body(book_id)).await;

    let (status, rows) = app.get("/api/v1/borrowings?user_id=abc", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user"], alice_id);

    let (status, rows) = app.get("/api/v1/borrowings?user_id=", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().map(Vec::len), Some(2));

    let (status, rows) = app.get("/api/v1/borrowings?user_id=abc", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_return_into_full_inventory() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, _) = app.signup("reader@example.com").await;
    let book_id = app.add_book("Test Title", 1).await;

    let (_, borrowing) = app
        .post("/api/v1/borrowings", Some(&reader), borrow_body(book_id))
        .await;
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/books/{book_id}"),
            Some(&admin),
            Some(json!({ "inventory": i32::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/v1/borrowings/{}", borrowing["id"]);
    let (status, body) = app.post(&format!("{uri}/return"), Some(&reader), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert_eq!(app.inventory(book_id).await, i64::from(i32::MAX));

    let (_, details) = app.get(&uri, Some(&reader)).await;
    assert!(details["actual_return_date"].is_null());
}

#[tokio::test]
async fn test_anonymous_profile_replace_is_unauthenticated() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/v1/users/me",
            None,
            Some(json!({ "email": "bad", "password": "1" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationError");
}
