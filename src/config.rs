//! # Configuration Management
//!
//! Centralized configuration for the lookup gateway.
//!
//! The gateway reads one TOML file at startup: the bound endpoint and
//! message limits, logging, and the raw per-driver sections that the
//! [`Registry`](crate::registry::Registry) turns into drivers. Nothing is
//! re-read after initialization.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` / `apply_env()`
//!
//! ```toml
//! [server]
//! endpoint = "tcp://127.0.0.1:5555"
//!
//! [[drivers]]
//! label = "thinq"
//! kind = "http-thinq"
//! host = "api.thinq.com"
//! username = "u"
//! token = "t"
//! ```

use crate::driver::settings::{ConfigValue, RawDriverConfig};
use crate::driver::DriverKind;
use crate::error::{GatewayError, Result};
use crate::transport::endpoint::Endpoint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Default endpoint the gateway binds to
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:5555";

/// Default upper bound for an inbound request body
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Upper bound for a reply body accepted by the lookup client
pub const MAX_REPLY_SIZE: usize = 1024 * 1024;

/// Smallest request limit accepted by validation
const MIN_MESSAGE_SIZE: usize = 16;

/// Main gateway configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GatewayConfig {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Raw driver sections, in configuration order
    #[serde(default)]
    pub drivers: Vec<RawDriverConfig>,
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| GatewayError::Settings(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| GatewayError::Settings(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| GatewayError::Settings(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override settings from `LOOKUP_GATEWAY_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("LOOKUP_GATEWAY_ENDPOINT") {
            self.server.endpoint = endpoint;
        }

        if let Ok(size) = std::env::var("LOOKUP_GATEWAY_MAX_MESSAGE_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                self.server.max_message_size = val;
            }
        }

        if let Ok(level) = std::env::var("LOOKUP_GATEWAY_LOG_LEVEL") {
            if let Ok(val) = level.parse::<Level>() {
                self.logging.log_level = val;
            }
        }
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        let example = Self::default_with_overrides(|config| {
            config.drivers.push(
                RawDriverConfig::new("thinq", DriverKind::HttpThinq)
                    .with("host", "api.thinq.com")
                    .with("username", "user")
                    .with("token", "secret")
                    .with("timeout", ConfigValue::Integer(10)),
            );
        });

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GatewayError::Settings(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| GatewayError::Settings(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    /// Driver field validation happens when the registry builds the drivers.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.logging.validate());

        if self.drivers.is_empty() {
            errors.push("At least one driver must be configured".to_string());
        }

        let mut labels = HashSet::new();
        for driver in &self.drivers {
            if driver.label.trim().is_empty() {
                errors.push("Driver label cannot be empty".to_string());
            } else if !labels.insert(driver.label.as_str()) {
                errors.push(format!("Duplicate driver label: '{}'", driver.label));
            }
        }

        if let Some(ref default) = self.server.default_driver {
            if !labels.contains(default.as_str()) {
                errors.push(format!(
                    "Default driver '{default}' does not match any configured driver"
                ));
            }
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::Settings(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Endpoint to bind (`tcp://host:port`, `host:port` or `ipc:///path`)
    pub endpoint: String,

    /// Maximum accepted request body size in bytes
    pub max_message_size: usize,

    /// Driver that serves requests without an explicit selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_driver: Option<String>,

    /// Accept `label:key` requests addressing a specific driver
    #[serde(default)]
    pub driver_selector: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from(DEFAULT_ENDPOINT),
            max_message_size: MAX_MESSAGE_SIZE,
            default_driver: None,
            driver_selector: false,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.endpoint.is_empty() {
            errors.push("Server endpoint cannot be empty".to_string());
        } else if let Err(e) = Endpoint::parse(&self.endpoint) {
            errors.push(format!("Invalid server endpoint: {e}"));
        }

        if self.max_message_size < MIN_MESSAGE_SIZE {
            errors.push(format!(
                "Max message size too small: {} bytes (minimum: {MIN_MESSAGE_SIZE})",
                self.max_message_size
            ));
        } else if self.max_message_size > MAX_REPLY_SIZE {
            errors.push(format!(
                "Max message size too large: {} bytes (maximum: {MAX_REPLY_SIZE})",
                self.max_message_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("lookup-gateway"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
