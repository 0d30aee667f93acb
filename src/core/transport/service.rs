//! Transport service - starts the HTTP transport for a server.

use tracing::info;

use super::TransportResult;
use super::config::HttpConfig;
use super::http::HttpTransport;
use crate::core::McpServer;

/// Transport service - manages the transport layer for the MCP server.
pub struct TransportService {
    config: HttpConfig,
}

impl TransportService {
    /// Create a new transport service with the given configuration.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Log information about the configured transport.
    pub fn log_info(&self) {
        info!("Starting transport: {}", self.config.description());
    }

    /// Start the transport with the given MCP server.
    ///
    /// This method blocks until the transport is shut down.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        self.log_info();
        HttpTransport::new(self.config).run(server).await
    }
}
