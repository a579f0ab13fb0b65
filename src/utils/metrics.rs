//! Observability and Metrics
//!
//! Counters for the serving loop, owned by the gateway context and shared
//! with the listener and dispatcher.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{ErrorKind, GatewayError};

/// Metrics collector for gateway operations
#[derive(Debug)]
pub struct Metrics {
    /// Total connections accepted
    pub connections_total: AtomicU64,
    /// Currently open connections
    pub connections_active: AtomicU64,
    /// Total request frames received
    pub requests_received: AtomicU64,
    /// Total reply frames written
    pub replies_sent: AtomicU64,
    /// Total bytes received in request bodies
    pub bytes_received: AtomicU64,
    /// Total bytes written in reply bodies
    pub bytes_sent: AtomicU64,
    /// Successful resolutions
    pub resolutions_success: AtomicU64,
    /// Malformed or oversized requests
    pub protocol_errors: AtomicU64,
    /// Requests naming an unknown driver
    pub driver_not_found: AtomicU64,
    /// Backend failures
    pub driver_errors: AtomicU64,
    /// Connection read/write failures
    pub connection_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            requests_received: AtomicU64::new(0),
            replies_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            resolutions_success: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            driver_not_found: AtomicU64::new(0),
            driver_errors: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new connection
    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a request frame
    pub fn request_received(&self, byte_count: u64) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a reply frame
    pub fn reply_sent(&self, byte_count: u64) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a successful resolution
    pub fn resolution_success(&self) {
        self.resolutions_success.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failure answered with an error reply
    pub fn request_failed(&self, error: &GatewayError) {
        let counter = match error.kind() {
            ErrorKind::Protocol => &self.protocol_errors,
            ErrorKind::DriverNotFound => &self.driver_not_found,
            _ => &self.driver_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection error
    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            requests_received: self.requests_received.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            resolutions_success: self.resolutions_success.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            driver_not_found: self.driver_not_found.load(Ordering::Relaxed),
            driver_errors: self.driver_errors.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            requests_received = snapshot.requests_received,
            replies_sent = snapshot.replies_sent,
            bytes_received = snapshot.bytes_received,
            bytes_sent = snapshot.bytes_sent,
            resolutions_success = snapshot.resolutions_success,
            protocol_errors = snapshot.protocol_errors,
            driver_not_found = snapshot.driver_not_found,
            driver_errors = snapshot.driver_errors,
            connection_errors = snapshot.connection_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Gateway metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub requests_received: u64,
    pub replies_sent: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub resolutions_success: u64,
    pub protocol_errors: u64,
    pub driver_not_found: u64,
    pub driver_errors: u64,
    pub connection_errors: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
