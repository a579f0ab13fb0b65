//! # Resolver Registry
//!
//! Owns the configured drivers and routes each lookup to one of them.
//!
//! The registry is built once at startup and then frozen behind an `Arc`;
//! reads need no locking. Building is all-or-nothing: the first driver
//! whose configuration fails aborts initialization, so a partially built
//! registry never serves requests.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::driver::{self, Driver, RawDriverConfig, Resolution};
use crate::error::{constants, ErrorKind, GatewayError, Result};

#[derive(Default)]
pub struct Registry {
    drivers: HashMap<String, Box<dyn Driver>>,
    /// Labels in registration order
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one driver per section, in order. Driver ids are 1-based
    /// section positions.
    pub fn initialize(configs: &[RawDriverConfig]) -> Result<Self> {
        if configs.is_empty() {
            return Err(GatewayError::Settings(constants::ERR_NO_DRIVERS.to_string()));
        }

        let mut registry = Self::new();
        for (index, raw) in configs.iter().enumerate() {
            let uniq_id = u32::try_from(index + 1)
                .map_err(|_| GatewayError::config(&raw.label, "too many drivers"))?;
            let driver = driver::build(raw, uniq_id)?;
            registry.register(driver)?;
        }

        info!(drivers = registry.len(), "Resolver registry initialized");
        Ok(registry)
    }

    /// Add a driver under its label. Labels are unique.
    pub fn register(&mut self, driver: Box<dyn Driver>) -> Result<()> {
        let label = driver.label().to_string();
        if self.drivers.contains_key(&label) {
            return Err(GatewayError::config(&label, "duplicate driver label"));
        }

        debug!(driver = %label, name = driver.name(), "Driver registered");
        self.order.push(label.clone());
        self.drivers.insert(label, driver);
        Ok(())
    }

    /// Resolve `key` with the driver registered as `driver_id`.
    ///
    /// Unknown ids fail with `DriverNotFound` before any backend is touched.
    #[instrument(skip(self))]
    pub async fn resolve(&self, driver_id: &str, key: &str) -> Result<Resolution> {
        let driver = self
            .drivers
            .get(driver_id)
            .ok_or_else(|| GatewayError::DriverNotFound(driver_id.to_string()))?;

        driver.resolve(key).await.map_err(|e| match e.kind() {
            ErrorKind::Driver => e,
            _ => GatewayError::driver(e.to_string()),
        })
    }

    /// Diagnostic summary of a driver; `None` for unknown ids.
    pub fn describe(&self, driver_id: &str) -> Option<String> {
        self.drivers.get(driver_id).map(|driver| driver.describe())
    }

    /// Log every driver summary, in registration order
    pub fn show_info(&self) {
        for summary in self.order.iter().filter_map(|label| self.describe(label)) {
            info!("{summary}");
        }
    }

    pub fn contains(&self, driver_id: &str) -> bool {
        self.drivers.contains_key(driver_id)
    }

    /// Labels in registration order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// First registered label, the default route
    pub fn first_label(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
