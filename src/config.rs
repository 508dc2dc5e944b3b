//! Server and runtime configuration.
//!
//! Everything configurable is resolved once at startup and passed into the
//! dispatcher at construction time; handlers never read the environment.

use serde::{Deserialize, Serialize};

/// Name of the environment variable selecting the execution mode.
pub const ENV_MODE: &str = "SHEETSERVE_ENV";

/// Name of the environment variable carrying raw service-account JSON.
pub const ENV_CREDENTIAL_JSON: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Execution mode, taken from [`ENV_MODE`].
///
/// Anything other than `development` counts as production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Development,
    Production,
}

impl ExecutionMode {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("development") {
            ExecutionMode::Development
        } else {
            ExecutionMode::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == ExecutionMode::Development
    }
}

/// Environment-derived settings, captured once at startup and injected
/// into the credential resolver.
#[derive(Debug, Clone)]
pub struct RuntimeEnv {
    pub mode: ExecutionMode,

    /// Raw key JSON carried in [`ENV_CREDENTIAL_JSON`], if set.
    pub inline_credentials: Option<String>,
}

impl RuntimeEnv {
    pub fn from_env() -> Self {
        let mode = std::env::var(ENV_MODE)
            .map(|name| ExecutionMode::from_name(&name))
            .unwrap_or(ExecutionMode::Production);
        let inline_credentials = std::env::var(ENV_CREDENTIAL_JSON)
            .ok()
            .filter(|raw| !raw.trim().is_empty());
        Self {
            mode,
            inline_credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            port: 3000,
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_mode_from_name() {
        assert!(ExecutionMode::from_name("development").is_development());
        assert!(ExecutionMode::from_name("Development").is_development());
        assert!(!ExecutionMode::from_name("production").is_development());
        assert!(!ExecutionMode::from_name("").is_development());
    }
}
