use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

use crate::config::MAX_REPLY_SIZE;
use crate::core::frame::{Frame, FrameCodec};
use crate::error::{constants, GatewayError, Result};
use crate::protocol::message::Reply;
use crate::transport::endpoint::Endpoint;
use crate::transport::listener::BoxedStream;

/// Requester side of the gateway protocol.
///
/// Sends one lookup key per request and waits for the matching reply.
pub struct LookupClient {
    framed: Framed<BoxedStream, FrameCodec>,
}

impl LookupClient {
    /// Connect to a gateway endpoint
    #[instrument]
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let stream: BoxedStream = match endpoint {
            Endpoint::Tcp(addr) => Box::new(TcpStream::connect(addr.as_str()).await?),
            #[cfg(unix)]
            Endpoint::Ipc(path) => Box::new(UnixStream::connect(path).await?),
        };
        debug!("Connected to gateway");

        Ok(Self {
            framed: Framed::new(stream, FrameCodec::new(MAX_REPLY_SIZE)),
        })
    }

    /// Connect using an endpoint string such as `tcp://127.0.0.1:5555`
    pub async fn connect_str(address: &str) -> Result<Self> {
        Self::connect(&Endpoint::parse(address)?).await
    }

    /// Send a raw request body
    pub async fn send(&mut self, body: impl Into<Bytes>) -> Result<()> {
        self.framed.send(body.into()).await
    }

    /// Receive the next reply envelope
    pub async fn receive(&mut self) -> Result<Reply> {
        match self.framed.next().await {
            Some(Ok(Frame::Message(body))) => Reply::from_bytes(&body),
            Some(Ok(Frame::Oversized(len))) => Err(GatewayError::OversizedMessage(len)),
            Some(Err(e)) => Err(e),
            None => Err(GatewayError::Protocol(
                constants::ERR_CONNECTION_CLOSED.to_string(),
            )),
        }
    }

    /// Send a raw body and wait for its reply
    pub async fn request(&mut self, body: impl Into<Bytes>) -> Result<Reply> {
        self.send(body).await?;
        self.receive().await
    }

    /// Resolve `key` through the gateway
    pub async fn lookup(&mut self, key: &str) -> Result<Reply> {
        self.request(Bytes::copy_from_slice(key.as_bytes())).await
    }
}
