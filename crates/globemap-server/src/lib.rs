//! Global Problems Map backend: crisis and charity listings, cookie-based
//! JWT sessions with double-submit CSRF protection, and Stripe-backed
//! donations.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod services;

pub use config::Config;
pub use routes::{create_router, AppState};
