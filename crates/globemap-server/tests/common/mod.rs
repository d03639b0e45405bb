//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use cookie::Cookie;
use globemap_server::{create_router, db, db::DbPool, AppState, Config};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const WEBHOOK_SECRET: &str = "whsec_integration";

pub fn test_config() -> Config {
    Config {
        server_port: 0,
        sqlite_path: ":memory:".to_string(),
        secret_key: TEST_SECRET.to_string(),
        stripe_secret_key: None,
        stripe_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        // Nothing listens here; tests that need Stripe start a mock.
        stripe_api_base: "http://127.0.0.1:9".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        secure_cookies: false,
        bcrypt_cost: 4,
        rate_limit: false,
        json_logs: false,
    }
}

fn seed(pool: &DbPool) {
    let conn = pool.get().unwrap();
    conn.execute_batch(
        "INSERT INTO crises (id, title, category, country, latitude, longitude, severity, summary, description, start_date, is_active) VALUES
            (1, 'Syria Civil War', 'Conflict', 'Syria', 34.8021, 38.9968, 'Critical', 'Ongoing civil war causing massive displacement.', 'Millions in need of food, shelter, and medical care.', '2011-03-15', 1),
            (2, 'Turkey-Syria Earthquake', 'Disaster', 'Turkey', 37.1833, 37.0667, 'Critical', 'Devastating 7.8 magnitude earthquake.', 'Leaving millions homeless.', '2023-02-06', 1),
            (3, 'Amazon Deforestation', 'Climate', 'Brazil', -3.4653, -62.2159, 'High', 'Accelerating rainforest destruction.', 'Threatening global climate stability.', '2019-01-01', 1),
            (4, 'Sudan Displacement', 'Humanitarian', 'Sudan', 12.8628, 30.2176, 'High', 'Conflict-driven displacement.', 'Largest displacement crisis.', '2023-04-15', 1),
            (5, 'Archived Drought', 'Climate', 'Kenya', -0.0236, 37.9062, 'Critical', 'Past drought.', 'Resolved.', '2022-01-01', 0);
         INSERT INTO charities (id, name, description, donation_url, crisis_id) VALUES
            (1, 'White Helmets', 'Search and rescue in Syria.', 'https://example.org/wh', 1),
            (2, 'AFAD Relief', 'Earthquake response.', 'https://example.org/afad', 2),
            (3, 'Amazon Watch', 'Rainforest protection.', 'https://example.org/aw', 3),
            (4, 'Doctors Without Borders', 'Emergency medical aid.', 'https://example.org/msf', 1);",
    )
    .unwrap();
}

pub fn create_test_server_with(config: Config) -> (TestServer, DbPool) {
    let pool = db::create_memory_pool().unwrap();
    seed(&pool);

    let state = AppState::new(pool.clone(), config).unwrap();
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");
    (server, pool)
}

pub fn create_test_server() -> (TestServer, DbPool) {
    create_test_server_with(test_config())
}

/// Cookie values handed out by a successful register/login.
#[derive(Debug, Clone)]
pub struct Session {
    pub auth_token: String,
    pub csrf_token: String,
}

impl Session {
    /// Attach the session cookie only.
    pub fn authed(&self, request: TestRequest) -> TestRequest {
        request.add_cookie(Cookie::new("auth_token", self.auth_token.clone()))
    }

    /// Attach both cookies and the matching CSRF header.
    pub fn guarded(&self, request: TestRequest) -> TestRequest {
        self.authed(request)
            .add_cookie(Cookie::new("csrf_token", self.csrf_token.clone()))
            .add_header(csrf_header(), header_value(&self.csrf_token))
    }
}

pub fn csrf_header() -> HeaderName {
    HeaderName::from_static("x-csrf-token")
}

pub fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap()
}

fn session_from(response: &axum_test::TestResponse) -> Session {
    Session {
        auth_token: response.cookie("auth_token").value().to_string(),
        csrf_token: response.cookie("csrf_token").value().to_string(),
    }
}

pub async fn register(server: &TestServer, email: &str, password: &str) -> Session {
    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    session_from(&response)
}

pub async fn login(server: &TestServer, email: &str, password: &str) -> Session {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    session_from(&response)
}

/// Build a `Stripe-Signature` header for `payload` signed now.
pub fn stripe_signature(payload: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn succeeded_event(intent_id: &str, amount: i64, metadata: serde_json::Value) -> String {
    json!({
        "id": format!("evt_{intent_id}"),
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": intent_id,
            "object": "payment_intent",
            "amount": amount,
            "currency": "usd",
            "status": "succeeded",
            "metadata": metadata,
        }}
    })
    .to_string()
}

pub async fn deliver_webhook(server: &TestServer, payload: &str) -> axum_test::TestResponse {
    server
        .post("/api/payments/webhook")
        .add_header(
            HeaderName::from_static("stripe-signature"),
            header_value(&stripe_signature(payload, WEBHOOK_SECRET)),
        )
        .bytes(payload.to_string().into())
        .await
}
