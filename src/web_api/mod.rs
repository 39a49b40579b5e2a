//! WebAPI - HTTP endpoints
//!
//! ## Responsibilities
//!
//! - Sensor ingestion routes (field boards POST one reading at a time)
//! - Alert query surface
//! - Sensor position CRUD
//! - WebSocket endpoint for dashboard observers

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "db_connected": !state.pool.is_closed(),
    }))
}
