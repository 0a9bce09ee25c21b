//! API Module
//!
//! HTTP surface of the orchestrator: the webhook endpoint GitHub delivers
//! to, plus a health check for monitoring.

pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::payload::PayloadParser;
use crate::service::Lifecycle;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub parser: Arc<dyn PayloadParser>,
    pub lifecycle: Arc<Lifecycle>,
}

/// Create the main router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Webhook deliveries
        .route("/webhook", post(webhook::handle_webhook))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
