//! HTTP surface through the axum router, no sockets.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use f5_mcp::client::{ChannelContext, DeviceApi, DeviceRequest};
use f5_mcp::error::ToolError;
use f5_mcp::mcp::Dispatcher;
use f5_mcp::routes;
use f5_mcp::tools::ToolCatalog;

/// Answers every call with the same outcome.
struct Fixed(fn() -> Result<Option<Value>, ToolError>);

#[async_trait]
impl DeviceApi for Fixed {
    async fn send(
        &self,
        _ctx: &ChannelContext,
        _request: DeviceRequest,
    ) -> Result<Option<Value>, ToolError> {
        (self.0)()
    }
}

fn app(device: Fixed) -> Router {
    routes::router(Dispatcher::new(Arc::new(ToolCatalog::new()), Arc::new(device)))
}

fn ok_app() -> Router {
    app(Fixed(|| Ok(None)))
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

fn creds() -> Value {
    json!({
        "f5_url": "https://10.1.1.245",
        "f5_username": "admin",
        "f5_password": "admin"
    })
}

#[tokio::test]
async fn health_reports_tool_count() {
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(ok_app(), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["tools"], ToolCatalog::new().list_tools().len());
}

#[tokio::test]
async fn list_tools_returns_definitions() {
    let (status, body) = send(ok_app(), post("/mcp/list-tools", "{}")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    let tools = v["tools"].as_array().unwrap();
    let pool = tools.iter().find(|t| t["name"] == "configurePool").unwrap();
    assert_eq!(pool["inputSchema"]["type"], "object");
}

#[tokio::test]
async fn invoke_success_returns_content() {
    let mut args = creds();
    args["pool_name"] = json!("web1");
    let body = json!({ "name": "deletePool", "arguments": args }).to_string();
    let (status, body) = send(ok_app(), post("/mcp/invoke", &body)).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["content"][0]["type"], "text");
    assert_eq!(v["content"][0]["text"], "OK Pool 'web1' deleted.");
}

#[tokio::test]
async fn invoke_unknown_tool_is_bad_request() {
    let body = json!({ "params": { "name": "nope", "arguments": creds() } }).to_string();
    let (status, body) = send(ok_app(), post("/mcp/invoke", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["error"]["data"]["kind"], "unknown_tool");
}

#[tokio::test]
async fn invoke_without_name_is_bad_request() {
    let (status, _) = send(ok_app(), post("/mcp/invoke", r#"{"arguments":{}}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invoke_device_failure_is_bad_gateway() {
    let failing = app(Fixed(|| Err(ToolError::Transport("connection refused".into()))));
    let body = json!({ "name": "listAllPoolStat", "arguments": creds() }).to_string();
    let (status, body) = send(failing, post("/mcp/invoke", &body)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["error"]["code"], -32001);
}

#[tokio::test]
async fn rpc_notification_is_accepted_without_body() {
    let body = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
    let (status, body) = send(ok_app(), post("/", body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_empty());
}

#[tokio::test]
async fn rpc_parse_error_is_reported_in_band() {
    let (status, body) = send(ok_app(), post("/", "{not json")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["error"]["code"], -32700);
    assert_eq!(v["id"], Value::Null);
}

#[tokio::test]
async fn rpc_initialize_names_the_server() {
    let body = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
    let (status, body) = send(ok_app(), post("/", body)).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["result"]["serverInfo"]["name"], "f5-mcp");
}
