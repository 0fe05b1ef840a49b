use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".pr-details.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-details.toml.
/// All fields are optional; only the GitHub token must come from somewhere.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// Base URL of the REST API, without a trailing slash.
    pub api_base_url: String,
    /// Transport timeout for every upstream call.
    pub timeout_secs: u64,
    /// Upper bound on commit listings in flight for one inbound request.
    pub max_concurrency: usize,
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: "https://api.github.com".to_string(),
            timeout_secs: 30,
            max_concurrency: 8,
            user_agent: "pr-details".to_string(),
        }
    }
}

impl GitHubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or .pr-details.toml in the current
    /// directory. A missing default file yields the default config; an
    /// explicitly given path must exist.
    ///
    /// Environment overrides are applied afterwards: GITHUB_TOKEN fills a
    /// missing token and PORT replaces the configured port.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(
            std::env::var("GITHUB_TOKEN").ok(),
            std::env::var("PORT").ok(),
        );
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env(&mut self, token: Option<String>, port: Option<String>) {
        if self.github.token.is_none() {
            self.github.token = token.filter(|t| !t.trim().is_empty());
        }
        if let Some(port) = port.and_then(|p| p.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    /// The GitHub token, if configured and non-blank.
    pub fn github_token(&self) -> Option<&str> {
        self.github
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }
}
