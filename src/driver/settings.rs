//! Driver configuration: raw sections and their validated form.
//!
//! A raw section reaches a driver in one of two shapes, with identical field
//! semantics:
//!
//! - a `parameters` entry holding a JSON object, e.g.
//!   `parameters = '{"host": "api.thinq.com", "username": "u", "token": "t"}'`
//! - flat keys next to `label` and `kind`.
//!
//! [`DriverSettings::from_raw`] is all-or-nothing: a section that fails any
//! check never produces settings, so it never produces a driver.

use crate::driver::DriverKind;
use crate::error::{constants, GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Key holding a JSON-encoded parameter object
pub const PARAMETERS_KEY: &str = "parameters";

/// Backend timeout applied when a section does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest backend timeout accepted, in seconds
const MAX_TIMEOUT_SECS: i64 = 300;

/// A scalar configuration value, as found in TOML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ConfigValue {
    /// Textual view; numbers are not coerced into text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer view; numeric strings are accepted.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(v) => Some(*v),
            ConfigValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

/// How a raw section carries its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Fields live in a JSON object under `parameters`
    JsonParameters,
    /// Fields are flat keys of the section
    Flat,
}

/// One `[[drivers]]` section as supplied by the configuration loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDriverConfig {
    /// Section name, used as the driver id in the registry
    pub label: String,

    /// Backend protocol implemented by the driver
    pub kind: DriverKind,

    /// Remaining keys, interpreted by the driver
    #[serde(flatten)]
    pub fields: BTreeMap<String, ConfigValue>,
}

impl RawDriverConfig {
    pub fn new(label: impl Into<String>, kind: DriverKind) -> Self {
        Self {
            label: label.into(),
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Remove a field, returning the section for chaining
    pub fn without(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    pub fn format(&self) -> ConfigFormat {
        if self.fields.contains_key(PARAMETERS_KEY) {
            ConfigFormat::JsonParameters
        } else {
            ConfigFormat::Flat
        }
    }

    /// Fields in flat form, whichever shape the section uses
    fn flattened(&self) -> Result<BTreeMap<String, ConfigValue>> {
        match self.format() {
            ConfigFormat::Flat => Ok(self.fields.clone()),
            ConfigFormat::JsonParameters => {
                let text = self
                    .fields
                    .get(PARAMETERS_KEY)
                    .and_then(ConfigValue::as_text)
                    .ok_or_else(|| GatewayError::config(&self.label, constants::ERR_JSON_CONFIG))?;

                let document: serde_json::Value = serde_json::from_str(text)
                    .map_err(|_| GatewayError::config(&self.label, constants::ERR_JSON_CONFIG))?;

                let object = document
                    .as_object()
                    .ok_or_else(|| GatewayError::config(&self.label, constants::ERR_JSON_CONFIG))?;

                Ok(object
                    .iter()
                    .filter_map(|(key, value)| json_scalar(value).map(|v| (key.clone(), v)))
                    .collect())
            }
        }
    }
}

fn json_scalar(value: &serde_json::Value) -> Option<ConfigValue> {
    match value {
        serde_json::Value::Bool(b) => Some(ConfigValue::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(ConfigValue::Integer)
            .or_else(|| n.as_f64().map(ConfigValue::Float)),
        serde_json::Value::String(s) => Some(ConfigValue::Text(s.clone())),
        _ => None,
    }
}

/// URL scheme used to reach the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

/// Validated, immutable backend settings owned by one driver.
#[derive(Clone, PartialEq)]
pub struct DriverSettings {
    uniq_id: u32,
    label: String,
    host: String,
    port: Option<u16>,
    username: String,
    credential: String,
    timeout: Duration,
    scheme: Scheme,
}

impl DriverSettings {
    /// Validate a raw section for the driver with numeric id `uniq_id`.
    ///
    /// The credential is looked up as `token_<uniq_id>`, then `credential`,
    /// then `token`, so a deployment can rotate keys per driver id.
    pub fn from_raw(raw: &RawDriverConfig, uniq_id: u32) -> Result<Self> {
        let label = raw.label.as_str();
        let fields = raw.flattened()?;

        let host = required_text(&fields, &["host"])
            .ok_or_else(|| GatewayError::config(label, constants::ERR_HOST_INVALID))?;

        let username = required_text(&fields, &["username"])
            .ok_or_else(|| GatewayError::config(label, constants::ERR_USERNAME_INVALID))?;

        let keyed = format!("token_{uniq_id}");
        let credential = required_text(&fields, &[keyed.as_str(), "credential", "token"])
            .ok_or_else(|| {
                // Name the key the section actually uses
                let message = if fields.contains_key("credential") {
                    constants::ERR_CREDENTIAL_INVALID
                } else {
                    constants::ERR_TOKEN_INVALID
                };
                GatewayError::config(label, message)
            })?;

        let port = match fields.get("port") {
            None => None,
            Some(value) => Some(
                value
                    .as_integer()
                    .and_then(|p| u16::try_from(p).ok())
                    .filter(|p| *p != 0)
                    .ok_or_else(|| GatewayError::config(label, constants::ERR_PORT_INVALID))?,
            ),
        };

        let timeout = match fields.get("timeout") {
            None => DEFAULT_TIMEOUT,
            Some(value) => value
                .as_integer()
                .filter(|secs| (1..=MAX_TIMEOUT_SECS).contains(secs))
                .map(|secs| Duration::from_secs(secs as u64))
                .ok_or_else(|| GatewayError::config(label, constants::ERR_TIMEOUT_INVALID))?,
        };

        let scheme = match fields.get("scheme").map(|v| v.as_text()) {
            None => Scheme::Https,
            Some(Some(s)) if s.eq_ignore_ascii_case("https") => Scheme::Https,
            Some(Some(s)) if s.eq_ignore_ascii_case("http") => Scheme::Http,
            Some(_) => return Err(GatewayError::config(label, constants::ERR_SCHEME_INVALID)),
        };

        Ok(Self {
            uniq_id,
            label: label.to_string(),
            host,
            port,
            username,
            credential,
            timeout,
            scheme,
        })
    }

    pub fn uniq_id(&self) -> u32 {
        self.uniq_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }
}

// Credentials never reach logs through Debug
impl fmt::Debug for DriverSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverSettings")
            .field("uniq_id", &self.uniq_id)
            .field("label", &self.label)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("credential", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// First non-empty text value among `keys`
fn required_text(fields: &BTreeMap<String, ConfigValue>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .filter_map(ConfigValue::as_text)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
