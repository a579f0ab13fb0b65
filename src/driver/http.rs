//! REST lookup driver for ThinQ-style LRN services.
//!
//! Request URL: `https://api.thinq.com/lrn/extended/9194841422?format=json`
//!
//! Reply example:
//! ```json
//! {
//!    "lrn": "9198900000",
//!    "lerg": { "npa": "919", "nxx": "287", "company": "TW TELECOM OF NC" }
//! }
//! ```
//!
//! Certificate verification is disabled for this backend; the driver logs a
//! warning when it is built.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::driver::settings::{DriverSettings, RawDriverConfig, Scheme};
use crate::driver::{strip_wrapping_quotes, Driver, DriverKind, Resolution};
use crate::error::{constants, GatewayError, Result};

/// Path placed between the authority and the lookup key
pub const URL_PATH_PREFIX: &str = "/lrn/extended/";

/// Query appended after the lookup key
pub const URL_SUFFIX: &str = "?format=json";

/// Field of the backend reply carrying the resolved value
pub const RESPONSE_FIELD: &str = "lrn";

/// Largest backend reply body the driver will buffer
pub const MAX_BACKEND_REPLY: usize = 64 * 1024;

pub struct HttpThinqDriver {
    settings: DriverSettings,
    url_prefix: String,
    client: reqwest::Client,
}

impl HttpThinqDriver {
    /// Build the driver from a raw section; fails without side effects when
    /// any setting is invalid.
    pub fn new(raw: &RawDriverConfig, uniq_id: u32) -> Result<Self> {
        let settings = DriverSettings::from_raw(raw, uniq_id)?;

        let mut url_prefix = format!("{}://{}", settings.scheme().as_str(), settings.host());
        if let Some(port) = settings.port() {
            url_prefix.push_str(&format!(":{port}"));
        }
        url_prefix.push_str(URL_PATH_PREFIX);

        url::Url::parse(&url_prefix)
            .map_err(|_| GatewayError::config(settings.label(), constants::ERR_HOST_INVALID))?;

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(settings.timeout())
            .build()
            .map_err(|e| GatewayError::config(settings.label(), e.to_string()))?;

        warn!(
            driver = %settings.label(),
            host = %settings.host(),
            "TLS certificate verification is disabled for this backend"
        );

        Ok(Self {
            settings,
            url_prefix,
            client,
        })
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Full backend URL for `key`
    pub fn request_url(&self, key: &str) -> String {
        format!("{}{key}{URL_SUFFIX}", self.url_prefix)
    }

    fn effective_port(&self) -> u16 {
        self.settings.port().unwrap_or(match self.settings.scheme() {
            Scheme::Http => 80,
            Scheme::Https => 443,
        })
    }
}

#[async_trait]
impl Driver for HttpThinqDriver {
    fn id(&self) -> u32 {
        self.settings.uniq_id()
    }

    fn label(&self) -> &str {
        self.settings.label()
    }

    fn name(&self) -> &'static str {
        DriverKind::HttpThinq.name()
    }

    #[instrument(skip(self), fields(driver = %self.settings.label()))]
    async fn resolve(&self, key: &str) -> Result<Resolution> {
        let url = self.request_url(key);
        debug!(url = %url, "resolving by URL");

        let response = self
            .client
            .get(&url)
            .basic_auth(self.settings.username(), Some(self.settings.credential()))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "error on perform request");
                GatewayError::driver(e.to_string())
            })?;

        let status = response.status();
        let body = read_body(response).await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            debug!(%status, reply = %body, "backend rejected request");
            return Err(GatewayError::Driver {
                message: format!("HTTP request failed with status {status}"),
                raw_response: Some(body),
            });
        }

        parse_reply(&body)
    }

    fn describe(&self) -> String {
        format!(
            "[{}/{}] '{}' driver => address <{}:{}> [username - {}, timeout - {} seconds]",
            self.id(),
            self.label(),
            self.name(),
            self.settings.host(),
            self.effective_port(),
            self.settings.username(),
            self.settings.timeout().as_secs()
        )
    }
}

/// Read the response body, refusing anything above [`MAX_BACKEND_REPLY`].
async fn read_body(mut response: reqwest::Response) -> Result<Vec<u8>> {
    if response
        .content_length()
        .is_some_and(|len| len > MAX_BACKEND_REPLY as u64)
    {
        return Err(GatewayError::driver(constants::ERR_REPLY_TOO_LARGE));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| GatewayError::driver(e.to_string()))?
    {
        if body.len() + chunk.len() > MAX_BACKEND_REPLY {
            return Err(GatewayError::driver(constants::ERR_REPLY_TOO_LARGE));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Extract the resolved value from a backend reply body.
///
/// The `lrn` value is rendered as JSON text and one pair of wrapping quotes
/// is stripped, so a string field yields its content with any inner escapes
/// kept as they appear in the JSON.
pub fn parse_reply(body: &[u8]) -> Result<Resolution> {
    let raw = String::from_utf8_lossy(body).into_owned();
    debug!(reply = %raw, "HTTP reply");

    let document: Value = match serde_json::from_slice(body) {
        Ok(document) => document,
        Err(_) => {
            warn!(reply = %raw, "couldn't parse reply as JSON");
            return Err(GatewayError::Driver {
                message: constants::ERR_REPLY_PARSING.to_string(),
                raw_response: Some(raw),
            });
        }
    };

    let Some(value) = document.get(RESPONSE_FIELD) else {
        debug!(reply = %raw, "no '{RESPONSE_FIELD}' field in returned JSON object");
        return Err(GatewayError::Driver {
            message: constants::ERR_UNEXPECTED_RESPONSE.to_string(),
            raw_response: Some(raw),
        });
    };

    let rendered = value.to_string();
    let resolved = strip_wrapping_quotes(&rendered).to_string();
    Ok(Resolution::new(resolved, raw))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn raw() -> RawDriverConfig {
        RawDriverConfig::new("thinq", DriverKind::HttpThinq)
            .with("host", "api.example.com")
            .with("username", "u")
            .with("token", "t")
    }

    #[test]
    fn test_request_url_without_port() {
        let driver = HttpThinqDriver::new(&raw(), 1).expect("driver");
        assert_eq!(
            driver.request_url("9194841422"),
            "https://api.example.com/lrn/extended/9194841422?format=json"
        );
    }

    #[test]
    fn test_request_url_with_port() {
        let driver = HttpThinqDriver::new(&raw().with("port", 8443i64), 1).expect("driver");
        assert_eq!(
            driver.request_url("1"),
            "https://api.example.com:8443/lrn/extended/1?format=json"
        );
    }

    #[test]
    fn test_describe_omits_credential() {
        let driver = HttpThinqDriver::new(&raw().with("token", "s3cr3t"), 2).expect("driver");
        let summary = driver.describe();
        assert_eq!(
            summary,
            "[2/thinq] 'REST/ThinQ' driver => address <api.example.com:443> \
             [username - u, timeout - 10 seconds]"
        );
        assert!(!summary.contains("s3cr3t"));
    }

    #[test]
    fn test_unparsable_host_is_config_error() {
        let err = HttpThinqDriver::new(&raw().with("host", "bad host/"), 1)
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("host value is invalid!"));
    }

    #[test]
    fn test_parse_reply_strips_quotes() {
        let body = r#"{"lrn":"9198900000","lerg":{"npa":"919"}}"#;
        let resolution = parse_reply(body.as_bytes()).expect("resolution");
        assert_eq!(resolution.resolved_value(), "9198900000");
        assert_eq!(resolution.raw_response(), body);
    }

    #[test]
    fn test_parse_reply_numeric_value() {
        let resolution = parse_reply(br#"{"lrn":9198900000}"#).expect("resolution");
        assert_eq!(resolution.resolved_value(), "9198900000");
    }

    #[test]
    fn test_parse_reply_missing_field_keeps_body() {
        let body = r#"{"error":"not found"}"#;
        let err = parse_reply(body.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "unexpected response");
        assert_eq!(err.raw_response(), Some(body));
    }

    #[test]
    fn test_parse_reply_not_json() {
        let err = parse_reply(b"<html>").unwrap_err();
        assert_eq!(err.to_string(), "HTTP reply parsing error");
        assert_eq!(err.raw_response(), Some("<html>"));
    }

    #[test]
    fn test_parse_reply_strips_one_quote_layer() {
        let resolution = parse_reply(br#"{"lrn":"\"919\""}"#).expect("resolution");
        assert_eq!(resolution.resolved_value(), r#"\"919\""#);
    }

    #[test]
    fn test_parse_reply_invalid_utf8_is_parsing_error() {
        let err = parse_reply(b"{\"lrn\":\"\xff\"}").unwrap_err();
        assert_eq!(err.to_string(), "HTTP reply parsing error");
        assert!(err.raw_response().is_some());
    }

    #[test]
    fn test_default_port_follows_scheme() {
        let https = HttpThinqDriver::new(&raw(), 1).expect("driver");
        assert!(https.describe().contains("<api.example.com:443>"));

        let http = HttpThinqDriver::new(&raw().with("scheme", "http"), 1).expect("driver");
        assert!(http.describe().contains("<api.example.com:80>"));
    }
}
