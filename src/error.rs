//! Error taxonomy shared by the tool catalog, the device client and the
//! protocol surfaces.
//!
//! Degradations (non-JSON success bodies, unrecognized log shapes) are not
//! errors: they are logged and represented in data. Everything here ends up
//! on a reply's error channel.

use serde_json::{json, Value};

/// A failed tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A required argument is missing or has the wrong type. Raised before
    /// any device call.
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// No tool is registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The device could not be reached (connection refused, TLS, DNS, ...).
    #[error("Transport error reaching device: {0}")]
    Transport(String),

    /// The device answered with a non-success status. `body` is the raw
    /// response text, kept verbatim for diagnosis.
    #[error("Device API {method} {path} failed (HTTP {status}): {body}")]
    DeviceApi {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    /// A bug on our side (e.g. a panicking operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn missing(param: &str) -> Self {
        Self::Validation(format!("missing required parameter '{param}'"))
    }

    /// Stable, machine-readable kind carried in `error.data.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Transport(_) => "transport",
            Self::DeviceApi { .. } => "device_api",
            Self::Internal(_) => "internal",
        }
    }

    /// JSON-RPC error code for this failure.
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::Validation(_) => -32602,
            Self::UnknownTool(_) => -32601,
            Self::DeviceApi { .. } => -32000,
            Self::Transport(_) => -32001,
            Self::Internal(_) => -32603,
        }
    }

    /// Whether the caller (rather than the device) is at fault.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownTool(_))
    }

    /// The `error` object of a JSON-RPC reply.
    pub fn to_rpc_error(&self) -> Value {
        json!({
            "code": self.rpc_code(),
            "message": self.to_string(),
            "data": { "kind": self.kind() }
        })
    }
}
