//! # Error Types
//!
//! Error handling for the lookup gateway.
//!
//! Every failure in the crate is a [`GatewayError`]. Each variant belongs to
//! one [`ErrorKind`], and the kind decides how the failure is treated:
//!
//! - **Config**: a driver or gateway setting failed validation. Fatal at
//!   startup, the gateway never starts serving.
//! - **Protocol**: a malformed or oversized request. Answered with an error
//!   reply, the loop continues.
//! - **DriverNotFound**: the request addressed an unknown driver. Answered
//!   with an error reply.
//! - **Driver**: backend transport failure or an unusable backend response.
//!   Answered with an error reply.
//! - **FatalTransport**: the bound endpoint itself failed. The loop ends and
//!   the error reaches the process owner.
//!
//! ## Example Usage
//! ```rust
//! use lookup_gateway::error::{ErrorKind, GatewayError};
//!
//! let err = GatewayError::DriverNotFound("thinq".into());
//! assert_eq!(err.kind(), ErrorKind::DriverNotFound);
//! assert!(err.is_recoverable());
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Protocol validation errors
    pub const ERR_EMPTY_REQUEST: &str = "empty request";
    pub const ERR_NOT_UTF8: &str = "request is not valid UTF-8 text";
    pub const ERR_INVALID_KEY: &str = "request is not a valid lookup key";
    pub const ERR_MISSING_SELECTOR: &str = "driver selector is empty";

    /// Driver errors
    pub const ERR_REPLY_PARSING: &str = "HTTP reply parsing error";
    pub const ERR_UNEXPECTED_RESPONSE: &str = "unexpected response";
    pub const ERR_REPLY_TOO_LARGE: &str = "HTTP reply too large";

    /// Driver configuration errors
    pub const ERR_JSON_CONFIG: &str = "driver JSON config parsing error";
    pub const ERR_HOST_INVALID: &str = "host value is invalid!";
    pub const ERR_USERNAME_INVALID: &str = "user name value is invalid!";
    pub const ERR_TOKEN_INVALID: &str = "token value is invalid!";
    pub const ERR_CREDENTIAL_INVALID: &str = "credential value is invalid!";
    pub const ERR_PORT_INVALID: &str = "port value is invalid!";
    pub const ERR_TIMEOUT_INVALID: &str = "timeout value is invalid!";
    pub const ERR_SCHEME_INVALID: &str = "scheme value is invalid!";

    /// Registry errors
    pub const ERR_NO_DRIVERS: &str = "no drivers configured";

    /// Transport errors
    pub const ERR_CONNECTION_CLOSED: &str = "connection closed";
}

/// Reply status codes carried in the reply envelope.
pub mod status {
    /// Successful resolution
    pub const OK: i32 = 0;
    /// Backend failure; also the default error code
    pub const DRIVER_FAILURE: i32 = 1;
    /// Malformed or oversized request
    pub const PROTOCOL: i32 = 2;
    /// Unknown driver id
    pub const DRIVER_NOT_FOUND: i32 = 3;
    /// Anything else reaching the reply boundary
    pub const INTERNAL: i32 = 4;
}

/// Taxonomy of failures, see module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Protocol,
    DriverNotFound,
    Driver,
    FatalTransport,
}

// GatewayError is the primary error type for all gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("[{label}] configuration error: {message}")]
    Config { label: String, message: String },

    #[error("Configuration error: {0}")]
    Settings(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Message too large: {0} bytes")]
    OversizedMessage(usize),

    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    #[error("{message}")]
    Driver {
        message: String,
        /// Unmodified backend payload, kept for diagnostics only.
        raw_response: Option<String>,
    },

    #[error("Fatal transport error: {0}")]
    FatalTransport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl GatewayError {
    /// Build a configuration error for the driver labelled `label`.
    pub fn config(label: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Config {
            label: label.into(),
            message: message.into(),
        }
    }

    /// Build a driver error without a captured backend response.
    pub fn driver(message: impl Into<String>) -> Self {
        GatewayError::Driver {
            message: message.into(),
            raw_response: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Config { .. } | GatewayError::Settings(_) => ErrorKind::Config,
            GatewayError::Protocol(_)
            | GatewayError::OversizedMessage(_)
            | GatewayError::Serialization(_) => ErrorKind::Protocol,
            GatewayError::DriverNotFound(_) => ErrorKind::DriverNotFound,
            GatewayError::Driver { .. } => ErrorKind::Driver,
            GatewayError::FatalTransport(_) | GatewayError::Io(_) => ErrorKind::FatalTransport,
        }
    }

    /// Whether the serving loop survives this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Protocol | ErrorKind::DriverNotFound | ErrorKind::Driver
        )
    }

    /// Status code used when this failure is sent back as a reply.
    pub fn reply_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Driver => status::DRIVER_FAILURE,
            ErrorKind::Protocol => status::PROTOCOL,
            ErrorKind::DriverNotFound => status::DRIVER_NOT_FOUND,
            ErrorKind::Config | ErrorKind::FatalTransport => status::INTERNAL,
        }
    }

    /// Backend payload captured before the failure, if any.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            GatewayError::Driver { raw_response, .. } => raw_response.as_deref(),
            _ => None,
        }
    }
}

/// Type alias for Results using GatewayError
pub type Result<T> = std::result::Result<T, GatewayError>;
