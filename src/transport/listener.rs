//! # Transport Listener
//!
//! Binds the gateway endpoint and runs the dispatch loop.
//!
//! Each accepted connection gets a reader task that decodes frames and hands
//! them to the loop one at a time, waiting for the reply before reading the
//! next frame. The loop itself processes a single exchange at a time, so
//! replies leave in the order requests were taken and a slow backend call
//! stalls the whole gateway for at most the driver timeout.
//!
//! Shutdown is cooperative: [`ShutdownHandle::stop`] cancels the loop's next
//! wait. When a message and the stop signal are ready together, the stop
//! signal wins. A resolve already in flight runs to completion and its reply
//! is still delivered.
//!
//! Accept failures caused by descriptor or memory exhaustion pause accepting
//! for [`ACCEPT_BACKOFF`] while existing connections keep being served. Only
//! failures of the endpoint itself end the loop.

#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::core::frame::{Frame, FrameCodec};
use crate::error::{GatewayError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::transport::endpoint::Endpoint;
use crate::utils::metrics::Metrics;

/// How long shutdown waits for connection tasks to flush their last reply
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before accepting again after running out of descriptors
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Byte stream usable by the frame codec
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

pub type BoxedStream = Box<dyn AsyncStream>;

/// One request frame and the slot its reply goes back through
struct Exchange {
    frame: Frame,
    reply: oneshot::Sender<Bytes>,
}

/// Cloneable stop signal for a running [`Listener`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    /// Request shutdown. Idempotent; safe from any thread.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            info!("Gateway shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

enum Bound {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        path: PathBuf,
    },
}

impl Bound {
    async fn bind(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => Ok(Bound::Tcp(TcpListener::bind(addr.as_str()).await?)),
            #[cfg(unix)]
            Endpoint::Ipc(path) => {
                if path.exists() {
                    tokio::fs::remove_file(path).await.ok();
                }
                Ok(Bound::Unix {
                    listener: UnixListener::bind(path)?,
                    path: path.clone(),
                })
            }
        }
    }

    async fn accept(&self) -> io::Result<(BoxedStream, String)> {
        match self {
            Bound::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                stream.set_nodelay(true).ok();
                Ok((Box::new(stream), peer.to_string()))
            }
            #[cfg(unix)]
            Bound::Unix { listener, .. } => {
                let (stream, _) = listener.accept().await?;
                Ok((Box::new(stream), String::from("unix")))
            }
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Bound::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Bound::Unix { .. } => None,
        }
    }

    async fn cleanup(&self) {
        #[cfg(unix)]
        if let Bound::Unix { path, .. } = self {
            remove_socket_file(path).await;
        }
    }
}

#[cfg(unix)]
async fn remove_socket_file(path: &Path) {
    if path.exists() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            error!(error = %e, path = %path.display(), "Failed to remove socket file");
        } else {
            info!(path = %path.display(), "Removed socket file");
        }
    }
}

/// How an accept failure affects the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptFailure {
    /// Concerns a single peer; accept again right away
    Transient,
    /// The process is short of descriptors or memory; retry after a pause
    Exhausted,
    /// The endpoint itself is unusable
    Fatal,
}

fn classify_accept_error(error: &io::Error) -> AcceptFailure {
    match error.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => AcceptFailure::Transient,
        io::ErrorKind::OutOfMemory => AcceptFailure::Exhausted,
        _ if is_resource_exhaustion(error) => AcceptFailure::Exhausted,
        _ => AcceptFailure::Fatal,
    }
}

#[cfg(unix)]
fn is_resource_exhaustion(error: &io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(not(unix))]
fn is_resource_exhaustion(_error: &io::Error) -> bool {
    false
}

pub struct Listener {
    endpoint: Endpoint,
    bound: Bound,
    dispatcher: Arc<Dispatcher>,
    max_message_size: usize,
    shutdown: CancellationToken,
}

impl Listener {
    /// Bind `endpoint`. An unusable address is fatal.
    #[instrument(skip(endpoint, dispatcher), fields(endpoint = %endpoint))]
    pub async fn bind(
        endpoint: &Endpoint,
        dispatcher: Arc<Dispatcher>,
        max_message_size: usize,
    ) -> Result<Self> {
        let bound = Bound::bind(endpoint).await.map_err(|e| {
            error!(error = %e, "Failed to bind endpoint");
            GatewayError::FatalTransport(format!("failed to bind {endpoint}: {e}"))
        })?;

        info!(max_message_size, "Listening");
        Ok(Self {
            endpoint: endpoint.clone(),
            bound,
            dispatcher,
            max_message_size,
            shutdown: CancellationToken::new(),
        })
    }

    /// Bound TCP address; `None` for Unix sockets
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.local_addr()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: self.shutdown.clone(),
        }
    }

    pub fn stop(&self) {
        self.shutdown_handle().stop();
    }

    /// Run the dispatch loop until stopped or until the endpoint fails.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn run(self) -> Result<()> {
        let (exchange_tx, mut exchange_rx) = mpsc::channel::<Exchange>(1);
        let connections = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let metrics = self.dispatcher.metrics().clone();
        // Accepting is paused until this instant after resource exhaustion
        let mut accept_paused = false;
        let mut resume_accept = Instant::now();

        info!("Dispatch loop started");

        let outcome = loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received, leaving dispatch loop");
                    break Ok(());
                }

                Some(exchange) = exchange_rx.recv() => {
                    let reply = self.dispatcher.dispatch(exchange.frame).await;
                    if exchange.reply.send(reply).is_err() {
                        debug!("Requester left before the reply was ready");
                    }
                }

                _ = tokio::time::sleep_until(resume_accept), if accept_paused => {
                    debug!("Resuming accept");
                    accept_paused = false;
                }

                accepted = self.bound.accept(), if !accept_paused => match accepted {
                    Ok((stream, peer)) => {
                        tasks.spawn(serve_connection(
                            stream,
                            peer,
                            exchange_tx.clone(),
                            self.max_message_size,
                            connections.clone(),
                            metrics.clone(),
                        ));
                    }
                    Err(e) => match classify_accept_error(&e) {
                        AcceptFailure::Transient => {
                            metrics.connection_error();
                            warn!(error = %e, "Error accepting connection");
                        }
                        AcceptFailure::Exhausted => {
                            metrics.connection_error();
                            warn!(
                                error = %e,
                                backoff_ms = ACCEPT_BACKOFF.as_millis() as u64,
                                "Out of resources accepting connection, pausing accept"
                            );
                            accept_paused = true;
                            resume_accept = Instant::now() + ACCEPT_BACKOFF;
                        }
                        AcceptFailure::Fatal => {
                            error!(error = %e, "Endpoint failed, dispatch loop terminated");
                            break Err(GatewayError::FatalTransport(e.to_string()));
                        }
                    },
                },

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        };

        // Stop idle readers; a reader holding a reply still writes it
        drop(exchange_rx);
        connections.cancel();

        let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("Shutdown timeout reached, aborting open connections");
            tasks.abort_all();
        }

        self.bound.cleanup().await;
        info!("Dispatch loop stopped");
        outcome
    }
}

async fn serve_connection(
    stream: BoxedStream,
    peer: String,
    exchanges: mpsc::Sender<Exchange>,
    max_message_size: usize,
    shutdown: CancellationToken,
    metrics: Arc<Metrics>,
) {
    metrics.connection_established();
    debug!(peer = %peer, "Connection opened");

    let mut framed = Framed::new(stream, FrameCodec::new(max_message_size));

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = framed.next() => match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    metrics.connection_error();
                    warn!(peer = %peer, error = %e, "Failed to read request");
                    break;
                }
                None => break,
            },
        };

        metrics.request_received(frame.len() as u64);

        let (reply_tx, reply_rx) = oneshot::channel();
        let exchange = Exchange {
            frame,
            reply: reply_tx,
        };

        // Both fail only once the loop is gone
        if exchanges.send(exchange).await.is_err() {
            break;
        }
        let Ok(reply) = reply_rx.await else {
            break;
        };

        let len = reply.len() as u64;
        if let Err(e) = framed.send(reply).await {
            metrics.connection_error();
            warn!(peer = %peer, error = %e, "Failed to send reply");
            break;
        }
        metrics.reply_sent(len);
    }

    metrics.connection_closed();
    debug!(peer = %peer, "Connection closed");
}
