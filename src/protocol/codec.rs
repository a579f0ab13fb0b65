//! Request decoding and reply encoding. Pure: no I/O happens here.

use crate::driver::Resolution;
use crate::error::{constants, GatewayError, Result};
use crate::protocol::message::{Reply, Request};

/// Default separator between driver label and key when selectors are on
pub const DEFAULT_SELECTOR: char = ':';

#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolCodec {
    selector: Option<char>,
}

impl ProtocolCodec {
    /// Codec for plain-key requests; every request goes to the default driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec that also accepts `label<separator>key` requests
    pub fn with_selector(separator: char) -> Self {
        Self {
            selector: Some(separator),
        }
    }

    /// Decode a request body.
    ///
    /// Trailing NUL bytes and surrounding whitespace are ignored. The key
    /// must be non-empty and use only ASCII alphanumerics and `+ . _ -`.
    pub fn decode(&self, bytes: &[u8]) -> Result<Request> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| GatewayError::Protocol(constants::ERR_NOT_UTF8.to_string()))?;
        let text = text.trim_end_matches('\0').trim();

        if text.is_empty() {
            return Err(GatewayError::Protocol(constants::ERR_EMPTY_REQUEST.to_string()));
        }

        let (driver, key) = match self.selector.and_then(|sep| text.split_once(sep)) {
            Some((driver, key)) => {
                let driver = driver.trim();
                if driver.is_empty() {
                    return Err(GatewayError::Protocol(
                        constants::ERR_MISSING_SELECTOR.to_string(),
                    ));
                }
                (Some(driver.to_string()), key.trim())
            }
            None => (None, text),
        };

        if !is_lookup_key(key) {
            return Err(GatewayError::Protocol(constants::ERR_INVALID_KEY.to_string()));
        }

        Ok(Request {
            key: key.to_string(),
            driver,
        })
    }

    pub fn encode_success(&self, resolution: &Resolution) -> Vec<u8> {
        Reply::success(resolution.resolved_value()).to_bytes()
    }

    pub fn encode_error(&self, description: &str, code: i32) -> Vec<u8> {
        Reply::error(description, code).to_bytes()
    }

    /// Error reply whose status code follows the failure kind
    pub fn encode_failure(&self, error: &GatewayError) -> Vec<u8> {
        self.encode_error(&error.to_string(), error.reply_code())
    }
}

fn is_lookup_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'_' | b'-'))
}
