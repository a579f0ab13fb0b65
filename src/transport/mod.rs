//! # Transport Layer
//!
//! Endpoint parsing and the listener that runs the dispatch loop.
//!
//! ## Endpoints
//! - **TCP**: `tcp://host:port`
//! - **IPC**: `ipc:///path/to/socket` on Unix

pub mod endpoint;
pub mod listener;

pub use endpoint::Endpoint;
pub use listener::{Listener, ShutdownHandle};
