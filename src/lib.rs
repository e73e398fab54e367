#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unused_async)]
#![allow(clippy::redundant_closure_for_method_calls)]

//! f5-mcp library - MCP tools for F5 BIG-IP devices over iControl REST.
//!
//! - `client` - authenticated iControl REST calls, response normalization
//! - `identifiers` - partition-qualified, percent-encoded resource paths
//! - `shaper` - log extraction, truncation, config cleanup, stats tables
//! - `command` - validated remote shell commands
//! - `tools` - tool catalog, argument validation, operations
//! - `mcp` - JSON-RPC dispatch shared by every surface
//! - `stdio` - line-delimited stdin/stdout surface
//! - `routes` - HTTP surface (axum)
//! - `config` - TOML + env-var configuration
//! - `error` - error taxonomy and JSON-RPC error mapping

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod mcp;
pub mod routes;
pub mod shaper;
pub mod stdio;
pub mod tools;
