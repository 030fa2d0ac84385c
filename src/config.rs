//! Configuration loading.
//!
//! Applications describe their configuration as a serde struct, embed the
//! framework sections ([`ServerConfig`], [`LogConfig`]) in it, and load it
//! from a TOML file with [`load`]. Every section has defaults, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//! max_body_bytes = 1048576
//!
//! [log]
//! level = "info"
//! format = "json"
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {}", .0.join(", "))]
    Validation(Vec<String>),
}

/// Semantic checks run after parsing. Returns one message per problem.
pub trait Validate {
    fn validate(&self) -> Vec<String>;
}

/// Parses and validates a TOML configuration file.
pub fn load<T: DeserializeOwned + Validate>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Parses and validates TOML text.
pub fn parse<T: DeserializeOwned + Validate>(content: &str) -> Result<T, ConfigError> {
    let config: T = toml::from_str(content)?;
    let problems = config.validate();
    if problems.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(problems))
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (`host:port`).
    pub bind: String,

    /// Requests with a larger body are answered `413`.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1:8080".to_owned(), max_body_bytes: 1024 * 1024 }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind.parse()
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.socket_addr().is_err() {
            problems.push(format!("server.bind `{}` is not a socket address", self.bind));
        }
        if self.max_body_bytes == 0 {
            problems.push("server.max_body_bytes must be positive".to_owned());
        }
        problems
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, e.g. `info` or `capsule=debug,info`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), format: LogFormat::Pretty }
    }
}

impl Validate for LogConfig {
    fn validate(&self) -> Vec<String> {
        match tracing_subscriber::EnvFilter::try_new(&self.level) {
            Ok(_) => Vec::new(),
            Err(e) => vec![format!("log.level `{}`: {e}", self.level)],
        }
    }
}
