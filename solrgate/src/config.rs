//! Configuration management for solrgate
//!
//! Default config location: ~/.solrgate/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::{Error, Result};

/// Timeout used when the configured one is unset or non-positive
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default = "default_schemas_dir")]
    pub schemas_dir: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Solr connection settings. Read once and never rewritten.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_server_name")]
    pub server_name: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in milliseconds; values <= 0 fall back to 60s
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
}

fn default_server_name() -> String {
    "localhost".to_string()
}

fn default_server_port() -> u16 {
    80
}

fn default_timeout_ms() -> i64 {
    DEFAULT_TIMEOUT_MS as i64
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            server_port: default_server_port(),
            use_ssl: false,
            username: String::new(),
            password: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ConnectionConfig {
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout_ms > 0 {
            Duration::from_millis(self.timeout_ms as u64)
        } else {
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        }
    }

    /// `http(s)://server:port/solr/`, or `.../solr/<core>/` when a core is given
    pub fn base_url(&self, core: Option<&str>) -> Result<Url> {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let mut url = Url::parse(&format!(
            "{}://{}:{}/solr/",
            scheme, self.server_name, self.server_port
        ))?;
        if let Some(core) = core.filter(|c| !c.is_empty()) {
            url = url.join(&format!("{}/", core))?;
        }
        Ok(url)
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

/// What a search does when the engine call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryFailurePolicy {
    /// Return the error to the caller
    #[default]
    Surface,
    /// Log the error and answer as if nothing matched
    Recover,
}

/// What the result mapper does with a value it cannot coerce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Skip the field and log a warning
    #[default]
    Lenient,
    /// Abort mapping with a coercion error
    Strict,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
pub struct ConnectorConfig {
    #[serde(default)]
    pub on_query_failure: QueryFailurePolicy,
    #[serde(default)]
    pub coercion: CoercionPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// "pretty" or "json"; overridden by LOG_FORMAT
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Filter directives; overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,solrgate=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

fn default_schemas_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".solrgate")
        .join("schemas")
}

/// Expand ~ to home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if let Ok(rest) = path.strip_prefix("~") {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".into()))?;
        Ok(home.join(rest))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load from default location (~/.solrgate/config.toml)
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".into()))?;
        Self::load_or_create(&home.join(".solrgate").join("config.toml"))
    }

    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.schemas_dir = expand_tilde(&config.schemas_dir)?;
            Ok(config)
        } else {
            let config = Config::default();
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = config.save(config_path);
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}
