//! Configuration module for Murmur.

use serde::Deserialize;
use std::path::Path;

use crate::chat::{DEFAULT_DENYLIST, DEFAULT_MAX_HISTORY};
use crate::{MurmurError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whether to serve static files.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "public".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            serve_static: default_serve_static(),
            static_path: default_static_path(),
            cors_origins: vec![],
        }
    }
}

/// Chat behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Maximum number of messages kept in history.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Maximum nickname length in characters.
    #[serde(default = "default_max_nickname_length")]
    pub max_nickname_length: usize,
    /// Maximum message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Message attempts allowed before rate limiting kicks in.
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: u32,
    /// Seconds before one message attempt stops counting.
    #[serde(default = "default_rate_limit_decay")]
    pub rate_limit_decay_secs: u64,
    /// Words masked in messages and nicknames.
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
    /// Events queued per connection before further events to it are dropped.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_max_nickname_length() -> usize {
    20
}

fn default_max_message_length() -> usize {
    1000
}

fn default_rate_limit_threshold() -> u32 {
    10
}

fn default_rate_limit_decay() -> u64 {
    60
}

fn default_outbox_capacity() -> usize {
    256
}

fn default_denylist() -> Vec<String> {
    DEFAULT_DENYLIST.iter().map(|w| w.to_string()).collect()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_nickname_length: default_max_nickname_length(),
            max_message_length: default_max_message_length(),
            rate_limit_threshold: default_rate_limit_threshold(),
            rate_limit_decay_secs: default_rate_limit_decay(),
            denylist: default_denylist(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/murmur.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat configuration.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(MurmurError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| MurmurError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: listen port
    /// - `HOST`: bind address
    /// - `MURMUR_LOG_LEVEL`: log level
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(level) = get("MURMUR_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chat.max_history == 0 {
            return Err(MurmurError::Config(
                "chat.max_history must be at least 1".to_string(),
            ));
        }
        if self.chat.rate_limit_threshold == 0 {
            return Err(MurmurError::Config(
                "chat.rate_limit_threshold must be at least 1".to_string(),
            ));
        }
        if self.chat.outbox_capacity == 0 {
            return Err(MurmurError::Config(
                "chat.outbox_capacity must be at least 1".to_string(),
            ));
        }
        if self.chat.max_nickname_length == 0 {
            return Err(MurmurError::Config(
                "chat.max_nickname_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
