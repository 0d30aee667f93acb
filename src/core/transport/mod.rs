//! Transport layer for the MCP server.
//!
//! MCP runs over HTTP with server-sent events: each client holds an event
//! stream (its session) and posts JSON-RPC messages that are answered on that
//! stream.
//!
//! - `protocol` - JSON-RPC message types and error codes
//! - `session` - per-client sessions, ordered queues and routing
//! - `http` - the axum router and server lifecycle
//! - `rest` - the document generation shortcut for the UI

mod config;
mod error;
pub mod http;
pub mod protocol;
mod rest;
mod service;
pub mod session;

pub use config::HttpConfig;
pub use error::{TransportError, TransportResult};
pub use http::{HttpTransport, router};
pub use service::TransportService;
pub use session::{ChannelError, InvocationRequest, OutboundFrame, SessionId, SessionManager, SessionStream};
