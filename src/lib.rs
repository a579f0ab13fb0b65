//! # Lookup Gateway
//!
//! A message-socket front end that resolves subscriber identifiers through
//! pluggable backend drivers.
//!
//! A requester sends a lookup key; the [`Listener`](transport::Listener)
//! hands it to the [`Dispatcher`](protocol::dispatcher::Dispatcher), which
//! decodes it, resolves it through the [`Registry`](registry::Registry) and
//! answers with a [`Reply`](protocol::message::Reply) envelope: status `0`
//! and the resolved value, or a non-zero status and a description.
//!
//! ## Modules
//! - **config**: TOML configuration with validation
//! - **core**: length-prefixed framing
//! - **driver**: the `Driver` capability and its backends
//! - **registry**: driver ownership and selection
//! - **protocol**: request codec, reply envelope, dispatcher
//! - **transport**: endpoints and the dispatch loop
//! - **gateway**: the startup context tying it together
//! - **service**: lookup client
//! - **utils**: logging and metrics

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod core;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod transport;
pub mod utils;

pub use driver::{Driver, DriverKind, Resolution};
pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use protocol::message::{Reply, Request};
pub use registry::Registry;
pub use service::LookupClient;
pub use transport::{Endpoint, Listener, ShutdownHandle};
