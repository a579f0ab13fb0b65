use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{status, Result};

/// A decoded lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Subscriber identifier to resolve
    pub key: String,
    /// Explicit driver label, only set when selectors are enabled
    pub driver: Option<String>,
}

impl Request {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            driver: None,
        }
    }
}

/// Reply envelope: `status_code == 0` means success and `payload` is the
/// resolved value; anything else is a failure described by `payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub status_code: i32,
    pub payload: String,
}

impl Reply {
    pub fn success(payload: impl Into<String>) -> Self {
        Self {
            status_code: status::OK,
            payload: payload.into(),
        }
    }

    /// Error reply; a zero code would read as success and becomes `1`.
    pub fn error(description: impl Into<String>, code: i32) -> Self {
        let status_code = if code == status::OK {
            status::DRIVER_FAILURE
        } else {
            code
        };
        Self {
            status_code,
            payload: description.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == status::OK
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_else(|e| {
            error!(error = %e, "Failed to serialize reply envelope");
            Vec::new()
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
