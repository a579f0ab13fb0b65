//! # Core Wire Components
//!
//! Low-level message framing shared by the listener and the lookup client.
//!
//! ## Wire Format
//! ```text
//! [Length(4)] [Body(N)]
//! ```
//!
//! Requests carry the plain-text lookup key as the body; replies carry a
//! bincode-encoded [`Reply`](crate::protocol::message::Reply) envelope.
//!
//! ## Security
//! - Maximum request size enforced before allocation
//! - Oversized bodies are discarded, never buffered

pub mod frame;
