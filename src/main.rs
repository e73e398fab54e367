//! # f5-mcp
//!
//! MCP (Model Context Protocol) server exposing F5 BIG-IP operations as tools
//! for AI agents. Each tool call carries the device URL and credentials;
//! the server keeps no device state.
//!
//! ## Subcommands
//!
//! - `f5-mcp stdio` (default) - JSON-RPC over stdin/stdout, for agent hosts
//! - `f5-mcp serve` - JSON-RPC and simplified invoke endpoints over HTTP
//!
//! ## Architecture
//!
//! ```text
//! main.rs          - entry point, clap subcommands, tracing, graceful shutdown
//! config.rs        - TOML + env-var configuration
//! client.rs        - iControl REST client (DeviceApi)
//! identifiers.rs   - partition-qualified resource paths
//! command.rs       - validated remote shell commands
//! shaper/          - response shaping (logs, config dumps, stats, events)
//! tools/           - tool catalog and operations
//! mcp.rs           - JSON-RPC dispatcher and surface framing
//! stdio.rs         - stdio surface
//! routes/          - HTTP surface
//! ```

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};

use f5_mcp::client::{DeviceApi, HttpDevice};
use f5_mcp::config::Config;
use f5_mcp::mcp::{Dispatcher, StdioSurface, SERVER_VERSION};
use f5_mcp::tools::ToolCatalog;
use f5_mcp::{routes, stdio};

/// MCP server for F5 BIG-IP iControl REST.
#[derive(Parser)]
#[command(name = "f5-mcp", version)]
struct Cli {
    /// Path to TOML config file.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC on stdin/stdout (default when no subcommand given).
    Stdio,
    /// Serve over HTTP.
    Serve {
        /// Address to bind, overriding `[server] listen`.
        #[arg(long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("f5-mcp: configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Logs always go to stderr; stdout belongs to the stdio protocol
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    let device: Arc<dyn DeviceApi> = match HttpDevice::new(&config.device) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            eprintln!("f5-mcp: {e}");
            std::process::exit(1);
        }
    };
    let catalog = Arc::new(ToolCatalog::new());
    info!(
        "f5-mcp v{SERVER_VERSION} starting with {} tools",
        catalog.list_tools().len()
    );
    let dispatcher = Dispatcher::new(catalog, device);

    match cli.command.unwrap_or(Commands::Stdio) {
        Commands::Stdio => {
            let surface = StdioSurface {
                listing: config.protocol.stdio_tool_listing,
            };
            stdio::run_stdio(dispatcher, surface).await;
        }
        Commands::Serve { listen } => {
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            if let Err(e) = run_server(dispatcher, &config.server.listen).await {
                error!("{e}");
                std::process::exit(1);
            }
        }
    }
}

async fn run_server(dispatcher: Dispatcher, listen: &str) -> Result<(), String> {
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| format!("Failed to bind {listen}: {e}"))?;
    info!("Listening on {listen}");

    axum::serve(listener, routes::router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {e}"))?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                error!("Failed to register SIGTERM: {e}");
                ctrl_c.await.ok();
                info!("Received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received SIGINT");
    }
}
