//! Configuration management for esdump
//!
//! This module handles loading, parsing, and managing configuration from
//! various sources:
//! - Configuration files (TOML format)
//! - Environment variables (credentials and store address)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "ESDUMP_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store connection configuration
    pub connection: ConnectionConfig,

    /// Export pipeline configuration
    pub export: ExportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Elasticsearch base URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Username for basic authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Path to a CA certificate bundle (PEM) for TLS verification
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Export pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Index to export (may contain wildcards, e.g. `events-*`)
    #[serde(default)]
    pub index: String,

    /// Output filename prefix; files are named `{prefix}-{n}.csv`
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Number of documents requested per scroll page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Target output file size in megabytes; files rotate once they reach it
    #[serde(default = "default_target_size_mb")]
    pub target_size_mb: u64,

    /// Fixed, ordered list of output columns.
    ///
    /// This is the output contract for the whole run: every file gets this
    /// exact header, document fields outside it are dropped at write time,
    /// and it is never inferred from the data.
    #[serde(default)]
    pub schema: Vec<String>,

    /// Array-valued fields copied through flattening as a single value
    #[serde(default)]
    pub preserve_fields: Vec<String>,

    /// Separator joining a field name and sub-key in flattened columns
    #[serde(default = "default_key_separator")]
    pub key_separator: String,

    /// Emit a progress log line every this many documents
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,

    /// Display an interactive progress bar
    #[serde(default = "default_progress_bar")]
    pub progress_bar: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_url() -> String {
    "https://localhost:9200".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_output_prefix() -> String {
    "export".to_string()
}

fn default_page_size() -> u32 {
    10_000
}

fn default_target_size_mb() -> u64 {
    100
}

fn default_key_separator() -> String {
    ".".to_string()
}

fn default_progress_every() -> u64 {
    10_000
}

fn default_progress_bar() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            ca_cert: None,
            timeout: default_timeout(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            index: String::new(),
            output_prefix: default_output_prefix(),
            page_size: default_page_size(),
            target_size_mb: default_target_size_mb(),
            schema: Vec::new(),
            preserve_fields: Vec::new(),
            key_separator: default_key_separator(),
            progress_every: default_progress_every(),
            progress_bar: default_progress_bar(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        let config: Config =
            toml::from_str(&text).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from file (if present) and environment variables.
    ///
    /// Command-line arguments are applied on top by the CLI layer, which
    /// completes the documented precedence order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Credentials and the store address can be supplied via `ESDUMP_URL`,
    /// `ESDUMP_USERNAME`, `ESDUMP_PASSWORD`, and `ESDUMP_CA_CERT`, keeping
    /// secrets out of config files and shell history.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(format!("{ENV_PREFIX}URL")) {
            self.connection.url = url;
        }
        if let Ok(username) = std::env::var(format!("{ENV_PREFIX}USERNAME")) {
            self.connection.username = Some(username);
        }
        if let Ok(password) = std::env::var(format!("{ENV_PREFIX}PASSWORD")) {
            self.connection.password = Some(password);
        }
        if let Ok(ca) = std::env::var(format!("{ENV_PREFIX}CA_CERT")) {
            self.connection.ca_cert = Some(PathBuf::from(ca));
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".esdump")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// Checks the values a run depends on: a non-empty index, at least one
    /// schema column, and sane pagination/rotation numbers.
    pub fn validate(&self) -> Result<()> {
        if self.export.index.trim().is_empty() {
            return Err(ConfigError::MissingField("export.index".to_string()).into());
        }
        if self.export.schema.is_empty() {
            return Err(ConfigError::MissingField("export.schema".to_string()).into());
        }
        if self.export.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.page_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.export.target_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.target_size_mb".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.export.key_separator.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "export.key_separator".to_string(),
                value: String::new(),
            }
            .into());
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout)
    }
}

impl ExportConfig {
    /// Rotation threshold in bytes
    pub fn target_size_bytes(&self) -> u64 {
        self.target_size_mb * 1024 * 1024
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
