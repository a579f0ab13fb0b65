//! # Utility Modules
//!
//! Supporting utilities for logging and observability.
//!
//! ## Components
//! - **Logging**: tracing subscriber setup from `LoggingConfig`
//! - **Metrics**: thread-safe counters for the serving loop

pub mod logging;
pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
