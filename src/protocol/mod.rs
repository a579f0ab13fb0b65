//! # Request Protocol
//!
//! Decoding of lookup requests, the reply envelope, and the dispatcher that
//! connects them to the resolver registry.
//!
//! ## Components
//! - **Message**: `Request` and the `Reply` envelope
//! - **Codec**: bytes to `Request`, results and errors to reply bytes
//! - **Dispatcher**: one frame in, one reply out

pub mod codec;
pub mod dispatcher;
pub mod message;
