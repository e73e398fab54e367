//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables** - `F5_MCP_LISTEN`, `F5_MCP_LOG_LEVEL`
//! 2. **Config file** - path via `--config <path>`, or `f5-mcp.toml` in CWD
//! 3. **Compiled defaults** - see each field's default value below
//!
//! Device endpoints and credentials are deliberately absent: every tool call
//! carries its own `f5_url` / `f5_username` / `f5_password`.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:3000"
//!
//! [device]
//! accept_invalid_certs = true   # BIG-IPs usually ship self-signed certs
//! # request_timeout_secs = 30   # unset = no timeout
//! log_device_traffic = false
//!
//! [protocol]
//! stdio_tool_listing = "definitions"   # or "names"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "f5-mcp.toml";

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP surface settings (`f5-mcp serve`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default `0.0.0.0:3000`).
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Outbound iControl REST client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Skip TLS certificate validation (default true). Devices are commonly
    /// managed over self-signed certificates.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    /// Per-request timeout in seconds. Unset means no timeout: a hung device
    /// stalls that invocation.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Log method, URL, status and a body preview of every device call at
    /// `debug` level. Credentials are never logged.
    #[serde(default)]
    pub log_device_traffic: bool,
}

/// How `tools/list` is rendered on a surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolListing {
    /// Full definitions with `inputSchema`.
    #[default]
    Definitions,
    /// Tool names only.
    Names,
}

/// Protocol surface settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolConfig {
    /// `tools/list` shape on the stdio surface (default `definitions`).
    #[serde(default)]
    pub stdio_tool_listing: ToolListing,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_accept_invalid_certs() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: default_accept_invalid_certs(),
            request_timeout_secs: None,
            log_device_traffic: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults.
    ///
    /// If `path` is `Some`, that file must exist and parse. Otherwise
    /// `f5-mcp.toml` in the current directory is used when present.
    pub fn load(path: Option<&str>) -> Result<Self, String> {
        let mut config = if let Some(p) = path {
            Self::from_file(Path::new(p))?
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        } else {
            Config::default()
        };

        if let Ok(listen) = std::env::var("F5_MCP_LISTEN") {
            config.server.listen = listen;
        }
        if let Ok(level) = std::env::var("F5_MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
        Self::parse(&content)
            .map_err(|e| format!("Failed to parse config file {}: {e}", path.display()))
    }

    /// Parse a TOML document into a config, applying defaults for absent keys.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:3000");
        assert!(config.device.accept_invalid_certs);
        assert_eq!(config.device.request_timeout_secs, None);
        assert!(!config.device.log_device_traffic);
        assert_eq!(config.protocol.stdio_tool_listing, ToolListing::Definitions);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(
            r#"
            [server]
            listen = "127.0.0.1:8080"

            [device]
            accept_invalid_certs = false
            request_timeout_secs = 15
            log_device_traffic = true

            [protocol]
            stdio_tool_listing = "names"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert!(!config.device.accept_invalid_certs);
        assert_eq!(config.device.request_timeout_secs, Some(15));
        assert!(config.device.log_device_traffic);
        assert_eq!(config.protocol.stdio_tool_listing, ToolListing::Names);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some("/nonexistent/f5-mcp.toml")).unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }
}
