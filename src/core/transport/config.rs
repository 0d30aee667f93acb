//! Transport configuration types.

use serde::{Deserialize, Serialize};

use crate::core::config::env_any;

/// HTTP+SSE transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,

    /// How many messages a single session may have waiting for execution.
    #[serde(default = "default_queue_capacity")]
    pub session_queue_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_cors() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::with_port(8080)
    }
}

impl HttpConfig {
    /// Defaults with the given port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            host: default_host(),
            enable_cors: default_cors(),
            session_queue_capacity: default_queue_capacity(),
        }
    }

    /// Load from environment variables, using `default_port` when neither
    /// `MCP_HTTP_PORT` nor `PORT` is set.
    pub fn from_env(default_port: u16) -> Self {
        let port = env_any(&["MCP_HTTP_PORT", "PORT"])
            .and_then(|p| p.parse().ok())
            .unwrap_or(default_port);
        let host = std::env::var("MCP_HTTP_HOST").unwrap_or_else(|_| default_host());
        let enable_cors = std::env::var("MCP_HTTP_CORS")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);
        let session_queue_capacity = std::env::var("MCP_SESSION_QUEUE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|c| *c > 0)
            .unwrap_or_else(default_queue_capacity);

        Self {
            port,
            host,
            enable_cors,
            session_queue_capacity,
        }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        format!("HTTP+SSE on {}", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::tests::{ENV_TEST_LOCK, clear_env};

    #[test]
    fn test_from_env_defaults() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();

        let config = HttpConfig::from_env(3005);
        assert_eq!(config.port, 3005);
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.enable_cors);
        assert_eq!(config.session_queue_capacity, 64);
        assert_eq!(config.description(), "HTTP+SSE on 0.0.0.0:3005");
    }

    #[test]
    fn test_cors_can_be_disabled() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("MCP_HTTP_CORS", "0");
        }

        assert!(!HttpConfig::from_env(3005).enable_cors);

        clear_env();
    }

    #[test]
    fn test_invalid_port_uses_default() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("PORT", "not-a-port");
        }

        assert_eq!(HttpConfig::from_env(3001).port, 3001);

        clear_env();
    }
}
