//! Router Configuration
//!
//! Connection parameters for both pools, plus loading from a TOML file at
//! `~/.config/rwpool/rwpool.toml` with environment overrides.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (applied by the caller after loading)
//! 2. Environment variables (`RWPOOL_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [database]
//! host = "10.0.0.5"
//! name = "shop"
//! username = "app"
//! password = "secret"
//!
//! [ports]
//! write = 6446
//! read = 6447
//!
//! [pool]
//! write_instances = 2
//! read_instances = 2
//! connect_timeout_secs = 2
//! idle_timeout_secs = 2
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::Endpoint;

/// Default port of the read/write endpoint
pub const DEFAULT_WRITE_PORT: u16 = 6446;
/// Default port of the read-only endpoint
pub const DEFAULT_READ_PORT: u16 = 6447;
/// Default number of workers per pool
pub const DEFAULT_INSTANCES: usize = 2;
/// Default connect and idle timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Router Configuration
// =============================================================================

/// Parameters for building the write and read pools
#[derive(Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Database host shared by both endpoints
    pub host: String,
    /// Database name
    pub database: String,
    /// Login user
    pub username: String,
    /// Login password
    pub password: String,
    /// Port of the write-capable endpoint
    pub write_port: u16,
    /// Port of the read-only endpoint
    pub read_port: u16,
    /// Number of workers in the write pool
    pub write_instances: usize,
    /// Number of workers in the read pool
    pub read_instances: usize,
    /// Upper bound for opening a session
    pub connect_timeout: Duration,
    /// Idle time after which a session is re-opened
    pub idle_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            write_port: DEFAULT_WRITE_PORT,
            read_port: DEFAULT_READ_PORT,
            write_instances: DEFAULT_INSTANCES,
            read_instances: DEFAULT_INSTANCES,
            connect_timeout: DEFAULT_TIMEOUT,
            idle_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("write_port", &self.write_port)
            .field("read_port", &self.read_port)
            .field("write_instances", &self.write_instances)
            .field("read_instances", &self.read_instances)
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl RouterConfig {
    /// Configuration with the given connection identity and default
    /// ports, pool sizes and timeouts
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Set both endpoint ports
    #[must_use]
    pub fn with_ports(mut self, write: u16, read: u16) -> Self {
        self.write_port = write;
        self.read_port = read;
        self
    }

    /// Set both pool sizes
    #[must_use]
    pub fn with_instances(mut self, write: usize, read: usize) -> Self {
        self.write_instances = write;
        self.read_instances = read;
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Endpoint for the write pool
    #[must_use]
    pub fn write_endpoint(&self) -> Endpoint {
        self.endpoint(self.write_port)
    }

    /// Endpoint for the read pool
    #[must_use]
    pub fn read_endpoint(&self) -> Endpoint {
        self.endpoint(self.read_port)
    }

    fn endpoint(&self, port: u16) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port,
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            connect_timeout: self.connect_timeout,
            idle_timeout: self.idle_timeout,
        }
    }

    /// Check that the configuration can produce working pools
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| -> Result<(), ConfigError> {
            Err(ConfigError::ValidationError(msg.to_string()))
        };

        if self.host.trim().is_empty() {
            return invalid("database host is required");
        }
        if self.database.trim().is_empty() {
            return invalid("database name is required");
        }
        if self.username.is_empty() {
            return invalid("database username is required");
        }
        if self.write_port == 0 || self.read_port == 0 {
            return invalid("ports must be non-zero");
        }
        if self.write_instances == 0 || self.read_instances == 0 {
            return invalid("pool sizes must be at least 1");
        }
        Ok(())
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Database section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseToml {
    /// Database host
    pub host: Option<String>,
    /// Database name
    pub name: Option<String>,
    /// Login user
    pub username: Option<String>,
    /// Login password
    pub password: Option<String>,
}

/// Ports section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsToml {
    /// Write endpoint port
    pub write: Option<u16>,
    /// Read endpoint port
    pub read: Option<u16>,
}

/// Pool section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolToml {
    /// Workers in the write pool
    pub write_instances: Option<usize>,
    /// Workers in the read pool
    pub read_instances: Option<usize>,
    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,
    /// Idle timeout in seconds
    pub idle_timeout_secs: Option<u64>,
}

/// Root of the TOML configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RwpoolToml {
    /// `[database]` section
    pub database: DatabaseToml,
    /// `[ports]` section
    pub ports: PortsToml,
    /// `[pool]` section
    pub pool: PoolToml,
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/rwpool/rwpool.toml` or
/// `~/.config/rwpool/rwpool.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rwpool").join("rwpool.toml"))
}

/// Load and validate configuration from the default path and the process
/// environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or if the resulting configuration is invalid.
pub fn load_config() -> Result<RouterConfig, ConfigError> {
    load_config_from_path(default_config_path().as_deref())
}

/// Load and validate configuration from a specific path and the process
/// environment
///
/// A missing file is not an error; defaults and environment apply.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// resulting configuration is invalid.
pub fn load_config_from_path(path: Option<&Path>) -> Result<RouterConfig, ConfigError> {
    let config = resolve_config(path, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Merge defaults, the TOML file at `path` and overrides read through
/// `lookup`, without validating
///
/// Callers that layer further overrides on top (CLI flags) validate once
/// they are done. A missing file is not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn resolve_config(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RouterConfig, ConfigError> {
    let mut config = RouterConfig::default();

    if let Some(config_path) = path {
        if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;
            apply_toml_config(&mut config, &parse_toml(&content)?);

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(path = %config_path.display(), "Config file not found, using defaults");
        }
    }

    apply_env_config(&mut config, lookup);
    Ok(config)
}

/// Parse the TOML configuration format
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] on malformed TOML.
pub fn parse_toml(content: &str) -> Result<RwpoolToml, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply TOML configuration values to the config struct
pub fn apply_toml_config(config: &mut RouterConfig, toml: &RwpoolToml) {
    if let Some(host) = &toml.database.host {
        config.host.clone_from(host);
    }
    if let Some(name) = &toml.database.name {
        config.database.clone_from(name);
    }
    if let Some(username) = &toml.database.username {
        config.username.clone_from(username);
    }
    if let Some(password) = &toml.database.password {
        config.password.clone_from(password);
    }

    if let Some(port) = toml.ports.write {
        config.write_port = port;
    }
    if let Some(port) = toml.ports.read {
        config.read_port = port;
    }

    if let Some(n) = toml.pool.write_instances {
        config.write_instances = n;
    }
    if let Some(n) = toml.pool.read_instances {
        config.read_instances = n;
    }
    if let Some(secs) = toml.pool.connect_timeout_secs {
        config.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = toml.pool.idle_timeout_secs {
        config.idle_timeout = Duration::from_secs(secs);
    }
}

/// Apply `RWPOOL_*` overrides read through `lookup`
///
/// Numeric values that fail to parse are ignored.
pub fn apply_env_config(config: &mut RouterConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("RWPOOL_HOST") {
        config.host = host;
    }
    if let Some(database) = lookup("RWPOOL_DATABASE") {
        config.database = database;
    }
    if let Some(username) = lookup("RWPOOL_USERNAME") {
        config.username = username;
    }
    if let Some(password) = lookup("RWPOOL_PASSWORD") {
        config.password = password;
    }

    let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(port) = number("RWPOOL_WRITE_PORT").and_then(|v| u16::try_from(v).ok()) {
        config.write_port = port;
    }
    if let Some(port) = number("RWPOOL_READ_PORT").and_then(|v| u16::try_from(v).ok()) {
        config.read_port = port;
    }
    if let Some(n) = number("RWPOOL_WRITE_INSTANCES").and_then(|v| usize::try_from(v).ok()) {
        config.write_instances = n;
    }
    if let Some(n) = number("RWPOOL_READ_INSTANCES").and_then(|v| usize::try_from(v).ok()) {
        config.read_instances = n;
    }
    if let Some(secs) = number("RWPOOL_CONNECT_TIMEOUT") {
        config.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = number("RWPOOL_IDLE_TIMEOUT") {
        config.idle_timeout = Duration::from_secs(secs);
    }
}
