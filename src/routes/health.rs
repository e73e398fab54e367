//! Health-check endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::mcp::SERVER_VERSION;

/// `GET /health`: liveness probe. Never touches a device.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": SERVER_VERSION,
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "tools": state.dispatcher.catalog().list_tools().len(),
    }))
}
