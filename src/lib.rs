//! Document MCP Server Library
//!
//! An MCP (Model Context Protocol) server that exposes document generation
//! and travel helpers as tools for AI agents, over HTTP with server-sent
//! events. One binary serves one of three applications, selected at startup:
//!
//! - **excellere**: Excel spreadsheets
//! - **mypdf**: PDF reports and PowerPoint decks
//! - **voyage**: destination search and weather lookups
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the server and the transport
//! - **domains**: business logic organized by bounded contexts
//!   - **documents**: renderers and the artifact store
//!   - **tools**: tool definitions, registry and executor
//!
//! # Example
//!
//! ```rust,no_run
//! use document_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone())?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{AppProfile, Config, Error, McpServer, Result};
