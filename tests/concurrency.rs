//! Shutdown and ordering behavior of the dispatch loop.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::time::{Duration, Instant};

use common::{driver_section, gateway_config, MockBackend, RunningGateway};
use lookup_gateway::gateway::Gateway;
use lookup_gateway::service::LookupClient;

const LRN_REPLY: &str = r#"{"lrn":"9198900000"}"#;

fn echo_backend(path: &str) -> (u16, String) {
    let key = path
        .trim_start_matches("/lrn/extended/")
        .trim_end_matches("?format=json");
    (200, format!(r#"{{"lrn":"{key}"}}"#))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_from_another_thread_while_idle() {
    let backend = MockBackend::json(LRN_REPLY).await;
    let gateway =
        RunningGateway::start(gateway_config(vec![driver_section("thinq", backend.addr)])).await;

    // Let the loop settle into its blocking wait
    tokio::time::sleep(Duration::from_millis(50)).await;

    let handle = gateway.shutdown.clone();
    let started = Instant::now();
    std::thread::spawn(move || handle.stop()).join().unwrap();

    gateway.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_stop_with_idle_connection_open() {
    let backend = MockBackend::json(LRN_REPLY).await;
    let gateway =
        RunningGateway::start(gateway_config(vec![driver_section("thinq", backend.addr)])).await;

    let mut client = LookupClient::connect_str(&gateway.endpoint()).await.unwrap();
    assert!(client.lookup("9194841422").await.unwrap().is_success());

    let started = Instant::now();
    gateway.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    // The idle connection was closed by the gateway
    assert!(client.lookup("9194841422").await.is_err());
}

#[tokio::test]
async fn test_stop_wins_over_pending_message() {
    let backend = MockBackend::json(LRN_REPLY).await;
    let gateway = Gateway::initialize(gateway_config(vec![driver_section(
        "thinq",
        backend.addr,
    )]))
    .unwrap();
    let listener = gateway.listen().await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Stop is requested before the loop ever runs, then a message arrives
    listener.stop();
    let mut client = LookupClient::connect_str(&format!("tcp://{addr}"))
        .await
        .unwrap();
    client.send("9194841422").await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), listener.run())
        .await
        .expect("loop should return immediately")
        .unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(2), client.receive())
        .await
        .expect("connection should be closed");
    assert!(reply.is_err(), "no reply expected after stop");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let backend = MockBackend::json(LRN_REPLY).await;
    let gateway =
        RunningGateway::start(gateway_config(vec![driver_section("thinq", backend.addr)])).await;

    assert!(!gateway.shutdown.is_stopped());
    gateway.shutdown.stop();
    gateway.shutdown.stop();
    assert!(gateway.shutdown.is_stopped());

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_in_flight_reply_is_delivered_after_stop() {
    let backend = MockBackend::start_with_delay(Duration::from_millis(300), |_| {
        (200, LRN_REPLY.to_string())
    })
    .await;
    let gateway =
        RunningGateway::start(gateway_config(vec![driver_section("thinq", backend.addr)])).await;

    let mut client = LookupClient::connect_str(&gateway.endpoint()).await.unwrap();
    client.send("9194841422").await.unwrap();

    // Wait until the backend call is in flight
    let deadline = Instant::now() + Duration::from_secs(2);
    while backend.requests().is_empty() {
        assert!(Instant::now() < deadline, "backend never called");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    gateway.shutdown.stop();

    let reply = client.receive().await.unwrap();
    assert_eq!(reply.payload, "9198900000");

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_pipelined_replies_keep_request_order() {
    let backend = MockBackend::start(echo_backend).await;
    let gateway =
        RunningGateway::start(gateway_config(vec![driver_section("thinq", backend.addr)])).await;

    let mut client = LookupClient::connect_str(&gateway.endpoint()).await.unwrap();

    let keys: Vec<String> = (0..5).map(|i| format!("91948414{i:02}")).collect();
    for key in &keys {
        client.send(key.clone()).await.unwrap();
    }
    for key in &keys {
        let reply = client.receive().await.unwrap();
        assert_eq!(&reply.payload, key);
    }

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_one_exchange_in_flight_at_a_time() {
    let delay = Duration::from_millis(150);
    let backend = MockBackend::start_with_delay(delay, echo_backend).await;
    let gateway =
        RunningGateway::start(gateway_config(vec![driver_section("thinq", backend.addr)])).await;

    let started = Instant::now();
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..3 {
        let endpoint = gateway.endpoint();
        tasks.spawn(async move {
            let mut client = LookupClient::connect_str(&endpoint).await.unwrap();
            let key = format!("919484142{i}");
            let reply = client.lookup(&key).await.unwrap();
            assert_eq!(reply.payload, key);
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    // Three serialized backend calls
    assert!(started.elapsed() >= delay * 3);

    gateway.stop().await.unwrap();
}
