//! Liveness probe
//!
//! Lets load balancers and uptime checks distinguish "orchestrator up"
//! from "webhook failing"; deliberately does not touch the allocator or
//! any backend host.

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
