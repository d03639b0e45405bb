mod common;

use axum::http::{header::AUTHORIZATION, HeaderValue};
use common::{create_test_server, login, register};
use cookie::Cookie;
use serde_json::{json, Value};

#[tokio::test]
async fn register_sets_session_cookies() {
    let (server, _pool) = create_test_server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": "X@Y.com", "password": "secret1" }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["user"]["email"], "x@y.com");
    assert!(body["user"].get("password_hash").is_none());

    let auth = response.cookie("auth_token");
    assert_eq!(auth.http_only(), Some(true));
    assert_eq!(auth.path(), Some("/"));

    let csrf = response.cookie("csrf_token");
    assert_ne!(csrf.http_only(), Some(true));
    assert_eq!(body["csrf_token"], csrf.value());
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (server, _pool) = create_test_server();
    register(&server, "x@y.com", "secret1").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": "x@y.com", "password": "another1" }))
        .await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["error"], "Email already registered");
}

#[tokio::test]
async fn register_validates_input() {
    let (server, _pool) = create_test_server();

    let short = server
        .post("/api/auth/register")
        .json(&json!({ "email": "x@y.com", "password": "12345" }))
        .await;
    assert_eq!(short.status_code(), 400);

    let bad_email = server
        .post("/api/auth/register")
        .json(&json!({ "email": "not-an-email", "password": "secret1" }))
        .await;
    assert_eq!(bad_email.status_code(), 400);
    assert!(bad_email.maybe_cookie("auth_token").is_none());
}

#[tokio::test]
async fn login_checks_the_password() {
    let (server, _pool) = create_test_server();
    register(&server, "x@y.com", "secret1").await;

    let wrong = server
        .post("/api/auth/login")
        .json(&json!({ "email": "x@y.com", "password": "wrong-password" }))
        .await;
    assert_eq!(wrong.status_code(), 401);
    assert_eq!(wrong.json::<Value>()["error"], "Invalid email or password");
    assert!(wrong.maybe_cookie("auth_token").is_none());

    let unknown = server
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@y.com", "password": "secret1" }))
        .await;
    assert_eq!(unknown.status_code(), 401);
    assert_eq!(unknown.json::<Value>()["error"], "Invalid email or password");

    let session = login(&server, "x@y.com", "secret1").await;
    assert!(!session.auth_token.is_empty());
}

#[tokio::test]
async fn me_accepts_cookie_or_bearer_token() {
    let (server, _pool) = create_test_server();
    let session = register(&server, "x@y.com", "secret1").await;

    let by_cookie = session.authed(server.get("/api/auth/me")).await;
    assert_eq!(by_cookie.status_code(), 200);
    assert_eq!(by_cookie.json::<Value>()["email"], "x@y.com");

    let by_bearer = server
        .get("/api/auth/me")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", session.auth_token)).unwrap(),
        )
        .await;
    assert_eq!(by_bearer.status_code(), 200);
    assert_eq!(by_bearer.json::<Value>()["email"], "x@y.com");
}

#[tokio::test]
async fn me_requires_a_valid_session() {
    let (server, _pool) = create_test_server();

    let anonymous = server.get("/api/auth/me").await;
    assert_eq!(anonymous.status_code(), 401);
    assert_eq!(anonymous.json::<Value>()["error"], "Not authenticated");

    let forged = server
        .get("/api/auth/me")
        .add_cookie(Cookie::new("auth_token", "not.a.jwt"))
        .await;
    assert_eq!(forged.status_code(), 401);
}

#[tokio::test]
async fn refresh_reissues_the_session() {
    let (server, _pool) = create_test_server();
    let session = register(&server, "x@y.com", "secret1").await;

    let response = session.guarded(server.post("/api/auth/refresh")).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["message"], "Token refreshed");
    let csrf = response.cookie("csrf_token");
    assert_eq!(body["csrf_token"], csrf.value());
    assert!(!response.cookie("auth_token").value().is_empty());
}

#[tokio::test]
async fn deleted_account_cannot_use_its_old_token() {
    let (server, _pool) = create_test_server();
    let session = register(&server, "x@y.com", "secret1").await;

    let deleted = session.guarded(server.delete("/api/me/account")).await;
    assert_eq!(deleted.status_code(), 200);
    assert_eq!(deleted.json::<Value>()["message"], "Account deleted successfully");

    // The JWT is still well formed, but the user behind it is gone.
    let me = session.authed(server.get("/api/auth/me")).await;
    assert_eq!(me.status_code(), 404);

    let refresh = session.guarded(server.post("/api/auth/refresh")).await;
    assert_eq!(refresh.status_code(), 401);

    let relogin = server
        .post("/api/auth/login")
        .json(&json!({ "email": "x@y.com", "password": "secret1" }))
        .await;
    assert_eq!(relogin.status_code(), 401);
}

#[tokio::test]
async fn change_email_updates_the_login() {
    let (server, _pool) = create_test_server();
    let session = register(&server, "old@y.com", "secret1").await;

    let response = session
        .guarded(server.patch("/api/me/email"))
        .json(&json!({ "email": "New@Y.com" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "new@y.com");

    let fresh = common::Session {
        auth_token: response.cookie("auth_token").value().to_string(),
        csrf_token: response.cookie("csrf_token").value().to_string(),
    };
    let me = fresh.authed(server.get("/api/auth/me")).await;
    assert_eq!(me.json::<Value>()["email"], "new@y.com");

    login(&server, "new@y.com", "secret1").await;
    let old = server
        .post("/api/auth/login")
        .json(&json!({ "email": "old@y.com", "password": "secret1" }))
        .await;
    assert_eq!(old.status_code(), 401);
}

#[tokio::test]
async fn change_email_rejects_a_taken_address() {
    let (server, _pool) = create_test_server();
    register(&server, "taken@y.com", "secret1").await;
    let session = register(&server, "mine@y.com", "secret1").await;

    let response = session
        .guarded(server.patch("/api/me/email"))
        .json(&json!({ "email": "taken@y.com" }))
        .await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["error"], "Email already registered");
}

#[tokio::test]
async fn change_password_replaces_the_old_one() {
    let (server, _pool) = create_test_server();
    let session = register(&server, "x@y.com", "secret1").await;

    let response = session
        .guarded(server.patch("/api/me/password"))
        .json(&json!({ "password": "better-secret" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["message"], "Password updated successfully");

    let old = server
        .post("/api/auth/login")
        .json(&json!({ "email": "x@y.com", "password": "secret1" }))
        .await;
    assert_eq!(old.status_code(), 401);

    login(&server, "x@y.com", "better-secret").await;
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let (server, _pool) = create_test_server();

    let not_json = server
        .post("/api/auth/register")
        .text("email=x@y.com&password=secret1")
        .await;
    assert_eq!(not_json.status_code(), 400);
    assert_eq!(not_json.json::<Value>()["error"], "Expected a JSON request body");

    let broken = server
        .post("/api/auth/login")
        .content_type("application/json")
        .bytes("{\"email\": ".into())
        .await;
    assert_eq!(broken.status_code(), 400);
    assert_eq!(broken.json::<Value>()["error"], "Malformed JSON body");

    let missing_field = server
        .post("/api/auth/register")
        .json(&json!({ "email": "x@y.com" }))
        .await;
    assert_eq!(missing_field.status_code(), 400);
    assert_eq!(missing_field.json::<Value>()["error"], "Invalid request body");
}

#[tokio::test]
async fn refresh_reports_storage_failures_as_server_errors() {
    let (server, pool) = create_test_server();
    let session = register(&server, "x@y.com", "secret1").await;

    pool.get().unwrap().execute_batch("DROP TABLE users").unwrap();

    let response = session.guarded(server.post("/api/auth/refresh")).await;
    assert_eq!(response.status_code(), 500);
    assert_eq!(response.json::<Value>()["error"], "Internal server error");
}
