mod account;
mod auth;
mod charities;
mod crises;
mod payments;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::auth::middleware::{optional_auth, require_auth, require_csrf};
use crate::auth::token::TokenService;
use crate::config::Config;
use crate::db::DbPool;
use crate::services::stripe::StripeClient;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: TokenService,
    pub stripe: StripeClient,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.secret_key);
        let stripe = StripeClient::new(&config)?;
        Ok(Self {
            db,
            config,
            tokens,
            stripe,
        })
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    // Auth routes: 10 requests burst, one more every 6 seconds per IP
    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    // Intent creation: 20 requests burst, one more every 3 seconds per IP
    let intent_routes = Router::new()
        .route("/api/payments/create-intent", post(payments::create_intent))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let (auth_routes, intent_routes) = if state.config.rate_limit {
        let auth_governor = GovernorConfigBuilder::default()
            .per_second(6)
            .burst_size(10)
            .finish()
            .expect("auth rate limit is non-zero");
        let intent_governor = GovernorConfigBuilder::default()
            .per_second(3)
            .burst_size(20)
            .finish()
            .expect("intent rate limit is non-zero");
        (
            auth_routes.layer(GovernorLayer::new(Arc::new(auth_governor))),
            intent_routes.layer(GovernorLayer::new(Arc::new(intent_governor))),
        )
    } else {
        (auth_routes, intent_routes)
    };

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/crises", get(crises::list))
        .route("/api/crises/{id}", get(crises::get))
        .route("/api/charities", get(charities::list))
        .route("/api/charities/by-crisis/{crisis_id}", get(charities::by_crisis))
        .route("/api/payments/status/{intent_id}", get(payments::status))
        .route("/api/payments/webhook", post(payments::webhook));

    let session = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/csrf-token", get(auth::csrf_token))
        .route("/api/me/donations", get(account::donations))
        .route("/api/me/donations/summary", get(account::donation_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // State-changing routes: session first, then the CSRF pair.
    let guarded = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/me/email", patch(account::change_email))
        .route("/api/me/password", patch(account::change_password))
        .route("/api/me/account", delete(account::delete_account))
        .route_layer(middleware::from_fn(require_csrf))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(auth_routes)
        .merge(intent_routes)
        .merge(session)
        .merge(guarded)
        .with_state(state)
}
