//! # Resolution Drivers
//!
//! A driver turns a lookup key into a [`Resolution`] by querying one
//! external data source. Drivers are built from raw configuration by
//! [`build`], a factory keyed on [`DriverKind`], and are stored behind the
//! [`Driver`] trait so the registry never sees concrete types.
//!
//! ## Components
//! - **Settings**: raw sections and validated backend settings
//! - **Http**: REST lookup against a ThinQ-style LRN service

pub mod http;
pub mod settings;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use http::HttpThinqDriver;
pub use settings::{ConfigValue, DriverSettings, RawDriverConfig};

/// Closed set of backend protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// REST lookup over HTTPS with basic authentication
    HttpThinq,
}

impl DriverKind {
    /// Human-readable driver name
    pub fn name(self) -> &'static str {
        match self {
            DriverKind::HttpThinq => "REST/ThinQ",
        }
    }

    /// Identifier used in configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            DriverKind::HttpThinq => "http-thinq",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    resolved_value: String,
    raw_response: String,
}

impl Resolution {
    pub fn new(resolved_value: impl Into<String>, raw_response: impl Into<String>) -> Self {
        Self {
            resolved_value: resolved_value.into(),
            raw_response: raw_response.into(),
        }
    }

    /// Normalized answer sent back to the requester
    pub fn resolved_value(&self) -> &str {
        &self.resolved_value
    }

    /// Unmodified backend payload, kept for audit
    pub fn raw_response(&self) -> &str {
        &self.raw_response
    }
}

/// Resolution capability shared by every backend variant.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Numeric id, the 1-based position of the driver's configuration section
    fn id(&self) -> u32;

    /// Configuration label; the registry key
    fn label(&self) -> &str;

    /// Human-readable driver name
    fn name(&self) -> &'static str;

    /// Resolve `key` against the backend
    async fn resolve(&self, key: &str) -> Result<Resolution>;

    /// One-line summary for diagnostics; never includes secrets
    fn describe(&self) -> String;
}

/// Construct the driver variant named by `raw.kind`.
pub fn build(raw: &RawDriverConfig, uniq_id: u32) -> Result<Box<dyn Driver>> {
    match raw.kind {
        DriverKind::HttpThinq => Ok(Box::new(HttpThinqDriver::new(raw, uniq_id)?)),
    }
}

/// Strip one leading and one trailing `"` if present.
///
/// ```
/// use lookup_gateway::driver::strip_wrapping_quotes;
///
/// assert_eq!(strip_wrapping_quotes("\"9198900000\""), "9198900000");
/// assert_eq!(strip_wrapping_quotes("9198900000"), "9198900000");
/// ```
pub fn strip_wrapping_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_is_idempotent() {
        let once = strip_wrapping_quotes("\"9198900000\"");
        assert_eq!(once, "9198900000");
        assert_eq!(strip_wrapping_quotes(once), once);
    }

    #[test]
    fn test_strip_one_sided_quotes() {
        assert_eq!(strip_wrapping_quotes("\"919"), "919");
        assert_eq!(strip_wrapping_quotes("919\""), "919");
        assert_eq!(strip_wrapping_quotes("\""), "");
        assert_eq!(strip_wrapping_quotes(""), "");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DriverKind::HttpThinq.name(), "REST/ThinQ");
        assert_eq!(DriverKind::HttpThinq.to_string(), "http-thinq");
    }
}
