use crate::core::frame::Frame;
use crate::driver::Resolution;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::protocol::codec::ProtocolCodec;
use crate::registry::Registry;
use crate::utils::metrics::{Metrics, Timer};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns one inbound frame into exactly one encoded reply.
///
/// This is the single boundary where failures from the codec, registry and
/// drivers become error envelopes; nothing below it can end the serving loop.
pub struct Dispatcher {
    registry: Arc<Registry>,
    codec: ProtocolCodec,
    default_driver: String,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        default_driver: impl Into<String>,
        codec: ProtocolCodec,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            registry,
            codec,
            default_driver: default_driver.into(),
            metrics,
        }
    }

    pub fn default_driver(&self) -> &str {
        &self.default_driver
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub async fn dispatch(&self, frame: Frame) -> Bytes {
        match self.process(frame).await {
            Ok(resolution) => {
                self.metrics.resolution_success();
                debug!(
                    resolved = %resolution.resolved_value(),
                    raw = %resolution.raw_response(),
                    "Lookup resolved"
                );
                Bytes::from(self.codec.encode_success(&resolution))
            }
            Err(e) => {
                self.metrics.request_failed(&e);
                match e.kind() {
                    ErrorKind::Driver => warn!(
                        error = %e,
                        raw = e.raw_response().unwrap_or_default(),
                        "Lookup failed"
                    ),
                    _ => info!(error = %e, "Request rejected"),
                }
                Bytes::from(self.codec.encode_failure(&e))
            }
        }
    }

    async fn process(&self, frame: Frame) -> Result<Resolution> {
        let body = match frame {
            Frame::Message(body) => body,
            Frame::Oversized(len) => return Err(GatewayError::OversizedMessage(len)),
        };

        let request = self.codec.decode(&body)?;
        let driver = request.driver.as_deref().unwrap_or(&self.default_driver);

        let _timer = Timer::start("resolve");
        self.registry.resolve(driver, &request.key).await
    }
}
