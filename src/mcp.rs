//! MCP (Model Context Protocol) JSON-RPC dispatch.
//!
//! One [`Dispatcher`] serves every transport. A transport implements
//! [`Surface`] (turn raw input into a message, turn a reply back into raw
//! output) and hands each message to [`Dispatcher::serve`].
//!
//! ## Supported methods
//!
//! | Method                                                      | Description                      |
//! |-------------------------------------------------------------|----------------------------------|
//! | `initialize`                                                | Handshake, returns capabilities  |
//! | `tools/list`, `mcp:list-tools`                              | List the tool catalog            |
//! | `tools/call`, `tools/invoke`, `mcp:invoke`, `mcp:call-tool` | Execute a tool                   |
//! | `ping`                                                      | Liveness check                   |
//!
//! Notifications (no `id`) are acknowledged silently.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::client::DeviceApi;
use crate::config::ToolListing;
use crate::error::ToolError;
use crate::tools::{ToolCatalog, ToolResult};

pub const SERVER_NAME: &str = "f5-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// Argument fields copied from `params` into `params.arguments` when a
/// client puts them at the outer level.
const HOISTED_FIELDS: &[&str] = &[
    "f5_url",
    "f5_username",
    "f5_password",
    "f5Url",
    "f5Username",
    "f5Password",
];

/// Outcome of decoding one unit of transport input.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A JSON value to dispatch.
    Message(Value),
    /// Input was rejected before dispatch; send this reply as-is.
    Reply(Value),
    /// Nothing to do (blank line, keep-alive).
    Skip,
}

/// A transport's framing: raw input to messages, replies to raw output.
pub trait Surface {
    /// Catalog form returned by `tools/list` on this surface.
    fn listing(&self) -> ToolListing;
    fn decode(&self, raw: &str) -> Decoded;
    fn encode(&self, reply: &Value) -> String;
}

/// Line-delimited JSON-RPC on stdin/stdout.
#[derive(Debug, Clone, Copy)]
pub struct StdioSurface {
    pub listing: ToolListing,
}

impl Surface for StdioSurface {
    fn listing(&self) -> ToolListing {
        self.listing
    }

    fn decode(&self, raw: &str) -> Decoded {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Decoded::Skip;
        }
        decode_json(trimmed)
    }

    fn encode(&self, reply: &Value) -> String {
        let mut out = serde_json::to_string(reply).unwrap_or_default();
        out.push('\n');
        out
    }
}

/// JSON-RPC in an HTTP request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSurface;

impl Surface for HttpSurface {
    fn listing(&self) -> ToolListing {
        ToolListing::Definitions
    }

    fn decode(&self, raw: &str) -> Decoded {
        decode_json(raw)
    }

    fn encode(&self, reply: &Value) -> String {
        serde_json::to_string(reply).unwrap_or_default()
    }
}

fn decode_json(raw: &str) -> Decoded {
    match serde_json::from_str(raw) {
        Ok(v) => Decoded::Message(v),
        Err(e) => Decoded::Reply(failure(
            Value::Null,
            rpc_error(PARSE_ERROR, format!("Parse error: {e}"), None),
        )),
    }
}

/// `{code, message[, data: {kind}]}`
pub fn rpc_error(code: i64, message: impl Into<String>, kind: Option<&str>) -> Value {
    let mut err = json!({ "code": code, "message": message.into() });
    if let Some(kind) = kind {
        err["data"] = json!({ "kind": kind });
    }
    err
}

fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn failure(id: Value, error: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

/// Error object for a call with no resolvable tool name.
pub fn missing_tool_name() -> Value {
    rpc_error(INVALID_PARAMS, "Missing tool name", Some("validation"))
}

/// Pull `(name, arguments)` out of call params.
///
/// The name comes from `params.name`, falling back to `params.arguments.name`.
/// Credentials given next to `name` are merged into the arguments unless the
/// arguments already carry them.
pub fn extract_call(params: &Value) -> Option<(String, Value)> {
    let mut arguments = match params.get("arguments") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    let name = params
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| arguments.get("name").and_then(Value::as_str))
        .filter(|n| !n.is_empty())?
        .to_string();

    for field in HOISTED_FIELDS {
        if arguments.contains_key(*field) {
            continue;
        }
        if let Some(v) = params.get(*field) {
            arguments.insert(field.to_string(), v.clone());
        }
    }

    Some((name, Value::Object(arguments)))
}

/// Stateless JSON-RPC dispatcher shared by every surface.
#[derive(Clone)]
pub struct Dispatcher {
    catalog: Arc<ToolCatalog>,
    device: Arc<dyn DeviceApi>,
}

impl Dispatcher {
    pub fn new(catalog: Arc<ToolCatalog>, device: Arc<dyn DeviceApi>) -> Self {
        Self { catalog, device }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Decode, dispatch and encode one unit of surface input. `None` means
    /// nothing is sent back.
    pub async fn serve<S: Surface>(&self, surface: &S, raw: &str) -> Option<String> {
        let reply = match surface.decode(raw) {
            Decoded::Skip => return None,
            Decoded::Reply(reply) => reply,
            Decoded::Message(message) => self.handle(message, surface.listing()).await?,
        };
        Some(surface.encode(&reply))
    }

    /// Handle one decoded message. Returns `None` for notifications.
    pub async fn handle(&self, message: Value, listing: ToolListing) -> Option<Value> {
        let id = message.get("id").cloned();
        let method = message.get("method").and_then(Value::as_str);

        // Notifications (no id): acknowledged silently
        if id.is_none() {
            match method {
                Some(m) if m.starts_with("notifications/") => {}
                Some(m) if message.get("jsonrpc").and_then(Value::as_str) == Some("2.0") => {
                    debug!(method = m, "ignoring notification");
                }
                _ => {
                    return Some(failure(
                        Value::Null,
                        rpc_error(INVALID_REQUEST, "Invalid Request", None),
                    ))
                }
            }
            return None;
        }
        let id = id.unwrap_or(Value::Null);

        let valid = message.get("jsonrpc").and_then(Value::as_str) == Some("2.0");
        let Some(method) = method.filter(|_| valid) else {
            return Some(failure(
                id,
                rpc_error(INVALID_REQUEST, "Invalid Request", None),
            ));
        };

        let params = message.get("params").cloned().unwrap_or_else(|| json!({}));
        let reply = match method {
            "initialize" => success(id, initialize_result()),
            "tools/list" | "mcp:list-tools" => success(id, self.tools_list(listing)),
            "tools/call" | "tools/invoke" | "mcp:invoke" | "mcp:call-tool" => {
                match extract_call(&params) {
                    None => failure(id, missing_tool_name()),
                    Some((name, arguments)) => match self.invoke(name, arguments).await {
                        Ok(result) => success(id, result.to_json()),
                        Err(e) => failure(id, e.to_rpc_error()),
                    },
                }
            }
            "ping" => success(id, json!({})),
            other => failure(
                id,
                rpc_error(METHOD_NOT_FOUND, format!("Method not found: {other}"), None),
            ),
        };
        Some(reply)
    }

    /// `{tools: [...]}` in the requested form.
    pub fn tools_list(&self, listing: ToolListing) -> Value {
        match listing {
            ToolListing::Definitions => json!({ "tools": self.catalog.definitions_json() }),
            ToolListing::Names => json!({ "tools": self.catalog.names() }),
        }
    }

    /// Run a tool in its own task so a panicking operation turns into an
    /// internal error instead of taking the surface down.
    pub async fn invoke(&self, name: String, arguments: Value) -> Result<ToolResult, ToolError> {
        let catalog = Arc::clone(&self.catalog);
        let device = Arc::clone(&self.device);
        let tool = name.clone();
        let started = Instant::now();

        let outcome = tokio::spawn(async move {
            catalog.invoke(&tool, &arguments, device.as_ref()).await
        })
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(join_err) => {
                error!(tool = %name, "tool task failed: {join_err}");
                Err(ToolError::Internal(format!("tool '{name}' failed: {join_err}")))
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(tool = %name, elapsed_ms, "tool call succeeded"),
            Err(e) => warn!(tool = %name, elapsed_ms, kind = e.kind(), "tool call failed: {e}"),
        }
        result
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false },
            "listTools": true,
            "invoke": true,
            "call": true
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::client::{ChannelContext, DeviceRequest};

    struct Panicking;

    #[async_trait]
    impl DeviceApi for Panicking {
        async fn send(
            &self,
            _ctx: &ChannelContext,
            _request: DeviceRequest,
        ) -> Result<Option<Value>, ToolError> {
            panic!("device exploded");
        }
    }

    struct Accepting;

    #[async_trait]
    impl DeviceApi for Accepting {
        async fn send(
            &self,
            _ctx: &ChannelContext,
            _request: DeviceRequest,
        ) -> Result<Option<Value>, ToolError> {
            Ok(None)
        }
    }

    fn dispatcher(device: Arc<dyn DeviceApi>) -> Dispatcher {
        Dispatcher::new(Arc::new(ToolCatalog::new()), device)
    }

    async fn call(d: &Dispatcher, message: Value) -> Option<Value> {
        d.handle(message, ToolListing::Definitions).await
    }

    #[tokio::test]
    async fn initialize_advertises_capabilities() {
        let d = dispatcher(Arc::new(Accepting));
        let reply = call(&d, json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" }))
            .await
            .unwrap();
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(reply["result"]["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(reply["result"]["capabilities"]["invoke"], true);
        assert_eq!(reply["result"]["serverInfo"]["name"], "f5-mcp");
    }

    #[tokio::test]
    async fn list_aliases_and_forms() {
        let d = dispatcher(Arc::new(Accepting));
        let full = call(&d, json!({ "jsonrpc": "2.0", "id": "a", "method": "mcp:list-tools" }))
            .await
            .unwrap();
        assert_eq!(full["result"]["tools"][0]["name"], "configurePool");
        assert!(full["result"]["tools"][0]["inputSchema"].is_object());

        let names = d
            .handle(
                json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
                ToolListing::Names,
            )
            .await
            .unwrap();
        assert_eq!(names["result"]["tools"][0], "configurePool");
    }

    #[tokio::test]
    async fn ping_and_unknown_method() {
        let d = dispatcher(Arc::new(Accepting));
        let pong = call(&d, json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" })).await.unwrap();
        assert_eq!(pong["result"], json!({}));

        let err = call(&d, json!({ "jsonrpc": "2.0", "id": 4, "method": "resources/list" }))
            .await
            .unwrap();
        assert_eq!(err["error"]["code"], -32601);
        assert_eq!(err["error"]["message"], "Method not found: resources/list");
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let d = dispatcher(Arc::new(Accepting));
        for m in ["notifications/initialized", "notifications/cancelled"] {
            assert!(call(&d, json!({ "jsonrpc": "2.0", "method": m })).await.is_none());
        }
    }

    #[tokio::test]
    async fn malformed_envelopes() {
        let d = dispatcher(Arc::new(Accepting));
        let r = call(&d, json!({ "id": 5, "method": "ping" })).await.unwrap();
        assert_eq!(r["error"]["code"], -32600);
        assert_eq!(r["id"], 5);

        let r = call(&d, json!({ "jsonrpc": "2.0", "id": 6 })).await.unwrap();
        assert_eq!(r["error"]["code"], -32600);

        let r = call(&d, json!([1, 2, 3])).await.unwrap();
        assert_eq!(r["error"]["code"], -32600);
        assert_eq!(r["id"], Value::Null);
    }

    #[tokio::test]
    async fn missing_tool_name_is_invalid_params() {
        let d = dispatcher(Arc::new(Accepting));
        let r = call(
            &d,
            json!({ "jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": { "arguments": {} } }),
        )
        .await
        .unwrap();
        assert_eq!(r["error"]["code"], -32602);
        assert_eq!(r["error"]["message"], "Missing tool name");
    }

    #[tokio::test]
    async fn name_and_credentials_fallbacks() {
        let d = dispatcher(Arc::new(Accepting));
        let r = call(
            &d,
            json!({
                "jsonrpc": "2.0", "id": 8, "method": "mcp:call-tool",
                "params": {
                    "f5_url": "https://h", "f5_username": "u", "f5_password": "p",
                    "arguments": { "name": "deletePool", "pool_name": "web1" }
                }
            }),
        )
        .await
        .unwrap();
        assert_eq!(r["result"]["content"][0]["text"], "OK Pool 'web1' deleted.");
    }

    #[tokio::test]
    async fn errors_carry_kind_and_code() {
        let d = dispatcher(Arc::new(Accepting));
        let r = call(
            &d,
            json!({ "jsonrpc": "2.0", "id": "x", "method": "tools/call",
                    "params": { "name": "deletePool", "arguments": {} } }),
        )
        .await
        .unwrap();
        assert_eq!(r["id"], "x");
        assert_eq!(r["error"]["code"], -32602);
        assert_eq!(r["error"]["data"]["kind"], "validation");
    }

    #[tokio::test]
    async fn panicking_operation_becomes_internal_error() {
        let d = dispatcher(Arc::new(Panicking));
        let r = call(
            &d,
            json!({ "jsonrpc": "2.0", "id": 9, "method": "tools/call", "params": {
                "name": "deletePool",
                "arguments": { "f5_url": "https://h", "f5_username": "u", "f5_password": "p", "pool_name": "x" }
            } }),
        )
        .await
        .unwrap();
        assert_eq!(r["id"], 9);
        assert_eq!(r["error"]["code"], -32603);
        assert_eq!(r["error"]["data"]["kind"], "internal");

        // the dispatcher keeps serving
        let pong = call(&d, json!({ "jsonrpc": "2.0", "id": 10, "method": "ping" })).await.unwrap();
        assert_eq!(pong["id"], 10);
    }

    #[tokio::test]
    async fn stdio_surface_framing() {
        let d = dispatcher(Arc::new(Accepting));
        let surface = StdioSurface {
            listing: ToolListing::Definitions,
        };
        assert!(d.serve(&surface, "   \n").await.is_none());

        let out = d.serve(&surface, "{not json").await.unwrap();
        assert!(out.ends_with('\n'));
        let v: Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(v["error"]["code"], -32700);
        assert_eq!(v["id"], Value::Null);

        let out = d
            .serve(&surface, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(out, "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n");
    }

    #[test]
    fn extract_call_prefers_outer_name_and_inner_credentials() {
        let (name, args) = extract_call(&json!({
            "name": "deletePool",
            "f5_url": "https://outer",
            "arguments": { "f5_url": "https://inner", "pool_name": "p" }
        }))
        .unwrap();
        assert_eq!(name, "deletePool");
        assert_eq!(args["f5_url"], "https://inner");
        assert!(extract_call(&json!({ "name": "" })).is_none());
        assert!(extract_call(&json!({})).is_none());
    }
}
