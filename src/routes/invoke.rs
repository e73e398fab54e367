//! Simplified tool endpoints for clients that don't speak JSON-RPC.
//!
//! - `POST /mcp/list-tools` - `{tools: [...]}`
//! - `POST /mcp/invoke` - body `{name, arguments}` or `{params: {name, arguments}}`
//!
//! Invocation errors map to HTTP status: `400` for unknown tools and bad
//! arguments, `502` when the device failed or couldn't be reached, `500` for
//! internal errors. The body is always `{"error": {code, message, data}}`.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::config::ToolListing;
use crate::error::ToolError;
use crate::mcp::{self, extract_call, missing_tool_name, PARSE_ERROR};

/// `POST /mcp/list-tools`
pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(state.dispatcher.tools_list(ToolListing::Definitions))
}

/// `POST /mcp/invoke`
pub async fn invoke(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let request: Value = serde_json::from_str(&body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": mcp::rpc_error(PARSE_ERROR, format!("Parse error: {e}"), None) })),
        )
    })?;

    let params = match request.get("params") {
        Some(p) if p.is_object() => p,
        _ => &request,
    };
    let (name, arguments) = extract_call(params).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": missing_tool_name() })),
        )
    })?;

    match state.dispatcher.invoke(name, arguments).await {
        Ok(result) => Ok(Json(result.to_json())),
        Err(e) => Err((status_for(&e), Json(json!({ "error": e.to_rpc_error() })))),
    }
}

fn status_for(err: &ToolError) -> StatusCode {
    if err.is_caller_error() {
        StatusCode::BAD_REQUEST
    } else if matches!(err, ToolError::Internal(_)) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_GATEWAY
    }
}
