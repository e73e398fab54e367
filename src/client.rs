//! HTTP client for the BIG-IP iControl REST API.
//!
//! [`HttpDevice`] wraps `reqwest::Client` and sends [`DeviceRequest`]s to one
//! of four API namespaces. Responses come back as `Option<serde_json::Value>`;
//! the tools layer handles shaping for the AI agent.
//!
//! ## Authentication
//!
//! There is no session. Every call carries its own [`ChannelContext`] and is
//! authenticated with HTTP Basic built from that context.
//!
//! ## Response normalization
//!
//! - non-2xx → [`ToolError::DeviceApi`] with the raw body kept verbatim
//! - 2xx with an empty body → `None` (DELETE commonly answers this way)
//! - 2xx with a body that isn't JSON → `None`, logged as a warning

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DeviceConfig;
use crate::error::ToolError;

/// Body previews in traffic logs are capped at this many characters.
const LOG_PREVIEW_CHARS: usize = 2000;

/// Per-call device address and credentials. Never cached, never logged.
#[derive(Clone)]
pub struct ChannelContext {
    base_url: String,
    username: String,
    password: String,
}

impl ChannelContext {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            // Strip trailing slash for consistent URL construction
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Management URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for ChannelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelContext")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// iControl REST namespace a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Local traffic objects: pools, members, virtual servers, iRules.
    TrafficMgmt,
    /// System objects: logs, CPU, TMM, certificates.
    System,
    /// Utility endpoints, notably remote bash execution.
    Utility,
    /// Application firewall (ASM) policies and events.
    AppFirewall,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::TrafficMgmt => "/mgmt/tm/ltm",
            Namespace::System => "/mgmt/tm/sys",
            Namespace::Utility => "/mgmt/tm/util",
            Namespace::AppFirewall => "/mgmt/tm/asm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One outbound call. `path` is relative to the namespace prefix and may
/// carry a query string.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    pub method: Method,
    pub namespace: Namespace,
    pub path: String,
    pub body: Option<Value>,
}

impl DeviceRequest {
    pub fn get(namespace: Namespace, path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            namespace,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(namespace: Namespace, path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            namespace,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn patch(namespace: Namespace, path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Patch,
            namespace,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(namespace: Namespace, path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            namespace,
            path: path.into(),
            body: None,
        }
    }

    /// Full URL for this request against `ctx`.
    pub fn url(&self, ctx: &ChannelContext) -> String {
        format!("{}{}{}", ctx.base_url(), self.namespace.prefix(), self.path)
    }
}

/// Anything that can carry a [`DeviceRequest`] to a device.
///
/// [`HttpDevice`] is the real implementation; tests substitute recording stubs.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn send(
        &self,
        ctx: &ChannelContext,
        request: DeviceRequest,
    ) -> Result<Option<Value>, ToolError>;
}

/// reqwest-backed [`DeviceApi`]. One instance is shared by all invocations.
pub struct HttpDevice {
    http: reqwest::Client,
    log_traffic: bool,
}

impl HttpDevice {
    pub fn new(config: &DeviceConfig) -> Result<Self, String> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self {
            http,
            log_traffic: config.log_device_traffic,
        })
    }
}

#[async_trait]
impl DeviceApi for HttpDevice {
    async fn send(
        &self,
        ctx: &ChannelContext,
        request: DeviceRequest,
    ) -> Result<Option<Value>, ToolError> {
        let url = request.url(ctx);
        if self.log_traffic {
            let body = request
                .body
                .as_ref()
                .map(serde_json::Value::to_string)
                .unwrap_or_default();
            debug!(
                method = request.method.as_str(),
                url = %url,
                body = %body,
                "device request"
            );
        }

        let mut builder = self
            .http
            .request(request.method.into(), &url)
            .header(reqwest::header::AUTHORIZATION, ctx.authorization());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ToolError::Transport(error_chain(&e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ToolError::Transport(error_chain(&e)))?;

        if self.log_traffic {
            debug!(
                status = status.as_u16(),
                body = %preview(&text, LOG_PREVIEW_CHARS),
                "device response"
            );
        }

        normalize_response(&request, status.as_u16(), &text)
    }
}

/// Map a raw HTTP outcome to the channel contract.
pub fn normalize_response(
    request: &DeviceRequest,
    status: u16,
    body: &str,
) -> Result<Option<Value>, ToolError> {
    if !(200..300).contains(&status) {
        return Err(ToolError::DeviceApi {
            method: request.method.as_str().to_string(),
            path: request.path.clone(),
            status,
            body: body.to_string(),
        });
    }

    if body.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(body) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!(
                method = request.method.as_str(),
                path = %request.path,
                "device returned non-JSON success body: {e}"
            );
            Ok(None)
        }
    }
}

/// Render an error with its whole `source()` chain; reqwest's top-level
/// message alone rarely names the actual cause.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
