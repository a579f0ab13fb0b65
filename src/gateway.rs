//! # Gateway Context
//!
//! The explicit, process-wide context: configuration, the frozen resolver
//! registry and the metrics collector. It is built once by
//! [`Gateway::initialize`], handed by reference to whatever needs it, and
//! released by [`Gateway::teardown`].
//!
//! ```no_run
//! use lookup_gateway::config::GatewayConfig;
//! use lookup_gateway::gateway::Gateway;
//!
//! # async fn serve() -> lookup_gateway::error::Result<()> {
//! let config = GatewayConfig::from_file("lookup-gateway.toml")?;
//! let gateway = Gateway::initialize(config)?;
//! let listener = gateway.listen().await?;
//! let outcome = listener.run().await;
//! gateway.teardown();
//! outcome
//! # }
//! ```

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::GatewayConfig;
use crate::error::{constants, GatewayError, Result};
use crate::protocol::codec::{ProtocolCodec, DEFAULT_SELECTOR};
use crate::protocol::dispatcher::Dispatcher;
use crate::registry::Registry;
use crate::transport::endpoint::Endpoint;
use crate::transport::listener::Listener;
use crate::utils::metrics::Metrics;

pub struct Gateway {
    config: GatewayConfig,
    endpoint: Endpoint,
    registry: Arc<Registry>,
    default_driver: String,
    metrics: Arc<Metrics>,
}

impl Gateway {
    /// Validate `config` and build every configured driver.
    ///
    /// Any configuration error is returned before anything is bound.
    #[instrument(skip(config))]
    pub fn initialize(config: GatewayConfig) -> Result<Self> {
        config.validate_strict()?;
        let registry = Registry::initialize(&config.drivers)?;
        Self::with_registry(config, registry)
    }

    /// Build the context around an already populated registry.
    pub fn with_registry(config: GatewayConfig, registry: Registry) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.server.endpoint)?;

        let default_driver = match config.server.default_driver.as_deref() {
            Some(label) if registry.contains(label) => label.to_string(),
            Some(label) => {
                return Err(GatewayError::Settings(format!(
                    "default driver '{label}' is not configured"
                )))
            }
            None => registry
                .first_label()
                .map(str::to_string)
                .ok_or_else(|| GatewayError::Settings(constants::ERR_NO_DRIVERS.to_string()))?,
        };

        info!(
            endpoint = %endpoint,
            default_driver = %default_driver,
            drivers = registry.len(),
            "Gateway initialized"
        );

        Ok(Self {
            config,
            endpoint,
            registry: Arc::new(registry),
            default_driver,
            metrics: Arc::new(Metrics::new()),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn default_driver(&self) -> &str {
        &self.default_driver
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Codec matching the configured selector policy
    pub fn codec(&self) -> ProtocolCodec {
        if self.config.server.driver_selector {
            ProtocolCodec::with_selector(DEFAULT_SELECTOR)
        } else {
            ProtocolCodec::new()
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.registry.clone(),
            self.default_driver.clone(),
            self.codec(),
            self.metrics.clone(),
        )
    }

    /// Bind the configured endpoint.
    pub async fn listen(&self) -> Result<Listener> {
        Listener::bind(
            &self.endpoint,
            Arc::new(self.dispatcher()),
            self.config.server.max_message_size,
        )
        .await
    }

    /// Release the context, logging final counters.
    pub fn teardown(self) {
        self.metrics.log_metrics();
        info!("Gateway torn down");
    }
}
