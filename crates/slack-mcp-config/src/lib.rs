use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bearer token for authentication (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            auth_token: None,
        }
    }
}

/// Slack Web API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackSettings {
    /// Base URL for the Slack Web API. Overridable for tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Maximum retries for rate-limited or failed requests.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Overall deadline for one invocation, covering the access
    /// guard check plus the API call plus any retries.
    #[serde(default = "default_invocation_timeout_secs")]
    pub invocation_timeout_secs: u64,
    /// How long a resolved credential may be served from memory.
    #[serde(default = "default_credential_cache_ttl_secs")]
    pub credential_cache_ttl_secs: u64,
}

fn default_invocation_timeout_secs() -> u64 {
    30
}

fn default_credential_cache_ttl_secs() -> u64 {
    300
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            invocation_timeout_secs: default_invocation_timeout_secs(),
            credential_cache_ttl_secs: default_credential_cache_ttl_secs(),
        }
    }
}

/// Top-level slack-mcp configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackMcpConfig {
    /// Gateway server config.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Slack API client config.
    #[serde(default)]
    pub slack: SlackSettings,
    /// Dispatcher config.
    #[serde(default)]
    pub dispatch: DispatchSettings,
    /// Path to the credential database. Defaults to
    /// `<config dir>/credentials.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl SlackMcpConfig {
    /// Resolve the credential database path, honoring the
    /// `SLACK_MCP_DB` environment override.
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var("SLACK_MCP_DB") {
            return Ok(PathBuf::from(path));
        }
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => Ok(ensure_config_dir()?.join("credentials.db")),
        }
    }

    /// Resolve the gateway listen port. An explicit override wins,
    /// then the `PORT` environment variable, then the configured
    /// value.
    pub fn resolve_port(&self, override_port: Option<u16>) -> u16 {
        if let Some(port) = override_port {
            return port;
        }
        match std::env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring unparseable PORT value {raw:?}");
                self.gateway.port
            }),
            Err(_) => self.gateway.port,
        }
    }
}

/// Resolve the slack-mcp config directory (~/.slack-mcp/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".slack-mcp"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.slack-mcp/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<SlackMcpConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<SlackMcpConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(SlackMcpConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: SlackMcpConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SlackMcpConfig::default();
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.slack.base_url, "https://slack.com/api");
        assert_eq!(config.slack.max_retries, 3);
        assert_eq!(config.dispatch.invocation_timeout_secs, 30);
        assert_eq!(config.dispatch.credential_cache_ttl_secs, 300);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            gateway: { port: 8080, auth_token: "sekrit" },
            slack: { max_retries: 5 },
            database_path: "/var/lib/slack-mcp/creds.db",
        }"#;
        let config: SlackMcpConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.auth_token, Some("sekrit".into()));
        assert_eq!(config.slack.max_retries, 5);
        // Unset sections keep their defaults
        assert_eq!(config.slack.base_url, "https://slack.com/api");
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/slack-mcp/creds.db"))
        );
    }

    // Single test touching PORT, so the process's environment is not
    // mutated from concurrently running tests.
    #[test]
    fn test_resolve_port_precedence() {
        let config = SlackMcpConfig::default();
        assert_eq!(config.resolve_port(None), 3000);
        assert_eq!(config.resolve_port(Some(4000)), 4000);

        unsafe { std::env::set_var("PORT", "8080") };
        assert_eq!(config.resolve_port(None), 8080);
        // An explicit override still wins over the environment.
        assert_eq!(config.resolve_port(Some(4000)), 4000);

        unsafe { std::env::set_var("PORT", "not-a-port") };
        assert_eq!(config.resolve_port(None), 3000);

        unsafe { std::env::remove_var("PORT") };
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let config = load_config_from(Path::new("/nonexistent/config.json5")).unwrap();
        assert_eq!(config.gateway.port, 3000);
    }
}
