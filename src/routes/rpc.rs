//! `POST /`: JSON-RPC 2.0 over HTTP.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::mcp::HttpSurface;

/// One JSON-RPC message per request body. Notifications get `202 Accepted`
/// with an empty body; everything else, errors included, gets `200` and a
/// JSON-RPC reply.
pub async fn rpc(State(state): State<AppState>, body: String) -> Response {
    match state.dispatcher.serve(&HttpSurface, &body).await {
        Some(reply) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            reply,
        )
            .into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
