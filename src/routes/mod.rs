//! HTTP surface (`f5-mcp serve`).
//!
//! | Method | Path              | Description                                  |
//! |--------|-------------------|----------------------------------------------|
//! | POST   | `/`               | JSON-RPC 2.0, same methods as stdio          |
//! | POST   | `/mcp/list-tools` | Tool definitions                             |
//! | POST   | `/mcp/invoke`     | Simplified call: `{name, arguments}`         |
//! | GET    | `/health`         | Liveness probe                               |

pub mod health;
pub mod invoke;
pub mod rpc;

use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::mcp::Dispatcher;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    /// Monotonic instant when the server started (for uptime calculation).
    pub start_time: Instant,
}

pub fn router(dispatcher: Dispatcher) -> Router {
    let state = AppState {
        dispatcher,
        start_time: Instant::now(),
    };
    Router::new()
        .route("/", post(rpc::rpc))
        .route("/mcp/list-tools", post(invoke::list_tools))
        .route("/mcp/invoke", post(invoke::invoke))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
