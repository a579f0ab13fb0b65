//! Shared helpers: a scripted HTTP backend and a gateway running on an
//! ephemeral port.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lookup_gateway::config::GatewayConfig;
use lookup_gateway::driver::{DriverKind, RawDriverConfig};
use lookup_gateway::error::Result;
use lookup_gateway::gateway::Gateway;
use lookup_gateway::transport::ShutdownHandle;
use lookup_gateway::utils::Metrics;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type Responder = dyn Fn(&str) -> (u16, String) + Send + Sync;

/// Minimal HTTP/1.1 backend answering every request through `respond`.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        Self::start_with_delay(Duration::ZERO, respond).await
    }

    /// Backend that waits `delay` before answering
    pub async fn start_with_delay<F>(delay: Duration, respond: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);

        let seen = requests.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let seen = seen.clone();
                let respond = respond.clone();
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head).to_string();
                    let path = head
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().unwrap().push(head);

                    tokio::time::sleep(delay).await;

                    let (status, body) = respond(&path);
                    let response = format!(
                        "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(response.as_bytes()).await.ok();
                    stream.shutdown().await.ok();
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    /// Backend that always answers 200 with `body`
    pub async fn json(body: &'static str) -> Self {
        Self::start(move |_| (200, body.to_string())).await
    }

    /// Raw request heads seen so far, lowercased
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|head| head.to_ascii_lowercase())
            .collect()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Driver section pointing at a plain-HTTP backend on `addr`
pub fn driver_section(label: &str, addr: SocketAddr) -> RawDriverConfig {
    RawDriverConfig::new(label, DriverKind::HttpThinq)
        .with("host", addr.ip().to_string())
        .with("port", i64::from(addr.port()))
        .with("scheme", "http")
        .with("username", "u")
        .with("token", "t")
        .with("timeout", 2i64)
}

pub fn gateway_config(drivers: Vec<RawDriverConfig>) -> GatewayConfig {
    GatewayConfig::default_with_overrides(|config| {
        config.server.endpoint = "tcp://127.0.0.1:0".to_string();
        config.drivers = drivers;
    })
}

/// A gateway serving on an ephemeral port
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub shutdown: ShutdownHandle,
    pub metrics: Arc<Metrics>,
    pub task: JoinHandle<Result<()>>,
}

impl RunningGateway {
    pub async fn start(config: GatewayConfig) -> Self {
        let gateway = Gateway::initialize(config).expect("gateway config");
        Self::serve(gateway).await
    }

    pub async fn serve(gateway: Gateway) -> Self {
        let listener = gateway.listen().await.expect("bind");
        let addr = listener.local_addr().expect("tcp address");
        let shutdown = listener.shutdown_handle();
        let metrics = gateway.metrics().clone();
        let task = tokio::spawn(listener.run());

        Self {
            addr,
            shutdown,
            metrics,
            task,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    /// Stop the loop and wait for it to return
    pub async fn stop(self) -> Result<()> {
        self.shutdown.stop();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("loop should stop promptly")
            .expect("loop task should not panic")
    }
}
