//! Configuration management for the MCP server.
//!
//! Configuration is assembled from defaults, shaped by the selected
//! [`AppProfile`], and overridden by environment variables (a `.env` file is
//! loaded first when present).

use super::transport::HttpConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::domains::tools::context::DEFAULT_WEATHER_API_URL;

// ============================================================================
// Application profiles
// ============================================================================

/// Which of the bundled applications this process serves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppProfile {
    /// Spreadsheet generation.
    #[default]
    Excellere,
    /// PDF reports and slide decks.
    #[serde(rename = "mypdf")]
    MyPdf,
    /// Travel planning helpers.
    Voyage,
}

/// Document kind produced by the `POST /api/generate` shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestShortcut {
    Spreadsheet,
    PdfReport,
}

impl AppProfile {
    pub const ALL: [AppProfile; 3] = [Self::Excellere, Self::MyPdf, Self::Voyage];

    /// Parse a profile name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "excellere" => Some(Self::Excellere),
            "mypdf" => Some(Self::MyPdf),
            "voyage" => Some(Self::Voyage),
            _ => None,
        }
    }

    /// Identifier used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellere => "excellere",
            Self::MyPdf => "mypdf",
            Self::Voyage => "voyage",
        }
    }

    /// Name reported to clients unless overridden.
    pub fn server_name(self) -> &'static str {
        match self {
            Self::Excellere => "Excellere",
            Self::MyPdf => "MyPDF Architect",
            Self::Voyage => "Voyage OS",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Self::Excellere => 3005,
            Self::MyPdf => 3006,
            Self::Voyage => 3001,
        }
    }

    /// Instructions sent with the `initialize` result.
    pub fn instructions(self) -> &'static str {
        match self {
            Self::Excellere => {
                "Generates Excel spreadsheets. Call generate_spreadsheet with sheets, columns and rows; the result contains a download link."
            }
            Self::MyPdf => {
                "Generates PDF reports and PowerPoint decks. The results contain download links."
            }
            Self::Voyage => {
                "Travel planning helpers: search destinations by budget and look up current weather by coordinates."
            }
        }
    }

    pub fn rest_shortcut(self) -> Option<RestShortcut> {
        match self {
            Self::Excellere => Some(RestShortcut::Spreadsheet),
            Self::MyPdf => Some(RestShortcut::PdfReport),
            Self::Voyage => None,
        }
    }
}

impl std::fmt::Display for AppProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Selected application.
    pub app: AppProfile,

    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// HTTP listener configuration.
    pub transport: HttpConfig,

    /// Where artifacts go and how they are linked.
    pub exports: ExportsConfig,

    /// Optional companion UI.
    pub ui: UiConfig,

    /// Tool execution settings.
    pub tools: ToolsConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportsConfig {
    /// Directory generated files are written to and served from.
    pub dir: PathBuf,

    /// Public host used in download links instead of `localhost`.
    pub public_domain: Option<String>,
}

/// Companion UI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Directory holding a built single-page app, served at `/`.
    pub dir: Option<PathBuf>,
}

/// Tool execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Upper bound on a single handler run, in seconds.
    pub timeout_secs: u64,

    /// Forecast API endpoint used by the weather tool.
    pub weather_api_url: String,
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
            public_domain: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            weather_api_url: DEFAULT_WEATHER_API_URL.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::for_profile(AppProfile::default())
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for a given application.
    pub fn for_profile(app: AppProfile) -> Self {
        Self {
            app,
            server: ServerConfig {
                name: app.server_name().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: HttpConfig::with_port(app.default_port()),
            exports: ExportsConfig::default(),
            ui: UiConfig::default(),
            tools: ToolsConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables are prefixed with `MCP_`. The platform-style names
    /// `APP_TYPE`, `PORT` and `RAILWAY_PUBLIC_DOMAIN` are accepted as fallbacks.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let app = match env_any(&["MCP_APP", "APP_TYPE"]) {
            Some(value) => AppProfile::parse(&value).unwrap_or_else(|| {
                warn!(
                    "Unknown application '{}', falling back to '{}'",
                    value,
                    AppProfile::default()
                );
                AppProfile::default()
            }),
            None => AppProfile::default(),
        };

        let mut config = Self::for_profile(app);

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = HttpConfig::from_env(app.default_port());

        if let Ok(dir) = std::env::var("MCP_EXPORTS_DIR") {
            config.exports.dir = PathBuf::from(dir);
        }

        config.exports.public_domain =
            env_any(&["MCP_PUBLIC_DOMAIN", "RAILWAY_PUBLIC_DOMAIN"]).filter(|d| !d.trim().is_empty());
        match &config.exports.public_domain {
            Some(domain) => info!("Download links will use public domain {}", domain),
            None => info!("No public domain set - download links point at localhost"),
        }

        if let Ok(dir) = std::env::var("MCP_UI_DIR") {
            config.ui.dir = Some(PathBuf::from(dir));
        }

        if let Ok(timeout) = std::env::var("MCP_TOOL_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => config.tools.timeout_secs = secs,
                _ => warn!(
                    "Ignoring invalid MCP_TOOL_TIMEOUT_SECS '{}', keeping {}s",
                    timeout, config.tools.timeout_secs
                ),
            }
        }

        if let Ok(url) = std::env::var("MCP_WEATHER_API_URL") {
            config.tools.weather_api_url = url;
        }

        config
    }
}

/// First set variable among `names`.
pub(crate) fn env_any(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| std::env::var(name).ok())
}
