//! MCP Server implementation and lifecycle management.
//!
//! `McpServer` wires the selected application together: the artifact store,
//! the renderers, the tool registry and executor, and the session manager.
//! The transport drives it; tools are defined under `domains/tools/`.

use rmcp::model::Tool;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::config::{AppProfile, Config};
use super::error::Result;
use super::transport::SessionManager;
use super::transport::protocol::DEFAULT_PROTOCOL_VERSION;
use crate::domains::documents::{ArtifactStore, Renderers};
use crate::domains::tools::{ToolContext, ToolExecutor, build_registry};

/// The main MCP server handler.
///
/// Cheap to clone; every clone shares the same registry and sessions.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Context handed to tool handlers.
    context: Arc<ToolContext>,

    /// Validates and runs tool calls.
    executor: Arc<ToolExecutor>,

    /// Live client sessions.
    sessions: SessionManager,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_renderers(config, Renderers::default())
    }

    /// Create a server using the given renderers.
    pub fn with_renderers(config: Config, renderers: Renderers) -> Result<Self> {
        let artifacts = ArtifactStore::new(
            &config.exports.dir,
            config.exports.public_domain.as_deref(),
            config.transport.port,
        );
        let context = Arc::new(ToolContext::new(
            artifacts,
            renderers,
            config.tools.weather_api_url.clone(),
        )?);

        let registry = build_registry(config.app, context.clone())?;
        let executor = Arc::new(
            ToolExecutor::new(registry).with_timeout(Duration::from_secs(config.tools.timeout_secs)),
        );
        let sessions = SessionManager::new(executor.clone(), config.transport.session_queue_capacity);

        info!(
            "Server '{}' ready with {} tool(s)",
            config.server.name,
            executor.registry().len()
        );

        Ok(Self {
            config: Arc::new(config),
            context,
            executor,
            sessions,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn profile(&self) -> AppProfile {
        self.config.app
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn context(&self) -> &Arc<ToolContext> {
        &self.context
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.context.artifacts
    }

    /// All tools, sorted by name.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.executor.registry().tools()
    }

    /// Result of the `initialize` handshake.
    ///
    /// The protocol version echoes what the client asked for.
    pub fn initialize_result(&self, requested_version: Option<&str>) -> Value {
        json!({
            "protocolVersion": requested_version.unwrap_or(DEFAULT_PROTOCOL_VERSION),
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": self.name(),
                "version": self.version()
            },
            "instructions": self.config.app.instructions()
        })
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("name", &self.config.server.name)
            .field("profile", &self.config.app)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn server(profile: AppProfile, dir: &TempDir) -> McpServer {
        let mut config = Config::for_profile(profile);
        config.exports.dir = dir.path().to_path_buf();
        McpServer::new(config).unwrap()
    }

    #[test]
    fn test_server_identity_follows_profile() {
        let dir = TempDir::new().unwrap();
        let server = server(AppProfile::Voyage, &dir);
        assert_eq!(server.name(), "Voyage OS");
        assert_eq!(server.profile(), AppProfile::Voyage);
        assert_eq!(server.artifacts().default_base_url(), "http://localhost:3001");

        let names: Vec<String> = server.list_tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["get_weather", "search_destinations"]);
    }

    #[test]
    fn test_initialize_echoes_protocol_version() {
        let dir = TempDir::new().unwrap();
        let server = server(AppProfile::Excellere, &dir);

        let result = server.initialize_result(Some("2025-03-26"));
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "Excellere");
        assert!(result["capabilities"]["tools"].is_object());

        let result = server.initialize_result(None);
        assert_eq!(result["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    }

    #[test]
    fn test_public_domain_used_for_links() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::for_profile(AppProfile::MyPdf);
        config.exports.dir = dir.path().to_path_buf();
        config.exports.public_domain = Some("docs.example.app".into());

        let server = McpServer::new(config).unwrap();
        assert_eq!(
            server.artifacts().default_base_url(),
            "https://docs.example.app"
        );
    }
}
