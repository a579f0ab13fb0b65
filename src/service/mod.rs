//! # Services
//!
//! Requester-side helpers built on the gateway wire protocol.

pub mod client;

pub use client::LookupClient;
