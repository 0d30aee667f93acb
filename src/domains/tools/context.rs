//! Shared state handed to tool handlers.

use std::time::Duration;

use crate::domains::documents::{ArtifactStore, Renderers};

use super::error::ToolError;

/// Default Open-Meteo forecast endpoint.
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.open-meteo.com/v1/forecast";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a tool handler may need besides its own parameters.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub artifacts: ArtifactStore,
    pub renderers: Renderers,
    pub http: reqwest::Client,
    pub weather_api_url: String,
}

impl ToolContext {
    /// Build a context with a fresh HTTP client.
    pub fn new(
        artifacts: ArtifactStore,
        renderers: Renderers,
        weather_api_url: impl Into<String>,
    ) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ToolError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            artifacts,
            renderers,
            http,
            weather_api_url: weather_api_url.into(),
        })
    }
}
