//! Endpoint addresses in message-socket notation.
//!
//! - `tcp://127.0.0.1:5555` or bare `127.0.0.1:5555`
//! - `ipc:///var/run/lookup.sock` (Unix only)

use std::fmt;
#[cfg(unix)]
use std::path::PathBuf;

use crate::error::{GatewayError, Result};

const TCP_PREFIX: &str = "tcp://";
const IPC_PREFIX: &str = "ipc://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `host:port`, resolved at bind/connect time
    Tcp(String),
    /// Unix domain socket path
    #[cfg(unix)]
    Ipc(PathBuf),
}

impl Endpoint {
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();

        if let Some(path) = address.strip_prefix(IPC_PREFIX) {
            return Self::ipc(path);
        }

        let authority = address.strip_prefix(TCP_PREFIX).unwrap_or(address);
        if authority.contains("://") {
            return Err(GatewayError::Settings(format!(
                "unsupported endpoint scheme: '{address}'"
            )));
        }

        let valid = authority
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !valid {
            return Err(GatewayError::Settings(format!(
                "'{address}' (expected format: 'tcp://127.0.0.1:5555')"
            )));
        }

        Ok(Endpoint::Tcp(authority.to_string()))
    }

    #[cfg(unix)]
    fn ipc(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(GatewayError::Settings("empty ipc socket path".to_string()));
        }
        Ok(Endpoint::Ipc(PathBuf::from(path)))
    }

    #[cfg(not(unix))]
    fn ipc(_path: &str) -> Result<Self> {
        Err(GatewayError::Settings(
            "ipc endpoints are only supported on Unix".to_string(),
        ))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "{TCP_PREFIX}{addr}"),
            #[cfg(unix)]
            Endpoint::Ipc(path) => write!(f, "{IPC_PREFIX}{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_tcp_forms() {
        assert_eq!(
            Endpoint::parse("tcp://127.0.0.1:5555").unwrap(),
            Endpoint::Tcp("127.0.0.1:5555".into())
        );
        assert_eq!(
            Endpoint::parse("localhost:0").unwrap(),
            Endpoint::Tcp("localhost:0".into())
        );
        assert_eq!(
            Endpoint::parse("[::1]:5555").unwrap().to_string(),
            "tcp://[::1]:5555"
        );
    }

    #[test]
    fn test_invalid_forms() {
        for address in ["", "127.0.0.1", ":5555", "tcp://host:port", "udp://1.2.3.4:5"] {
            assert!(Endpoint::parse(address).is_err(), "{address} should fail");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_ipc_form() {
        assert_eq!(
            Endpoint::parse("ipc:///tmp/lookup.sock").unwrap(),
            Endpoint::Ipc(PathBuf::from("/tmp/lookup.sock"))
        );
        assert!(Endpoint::parse("ipc://").is_err());
    }
}
