//! End-to-end HTTP tests.
//!
//! A real [`HttpServer`] on loopback in front of a simulated switcher,
//! driven with raw HTTP/1.1 over TCP.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use avswitch_control::ServiceConfig;
use avswitch_control::http::{AppState, HttpServer};
use common::{SimDevice, fast_config};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

// ============================================================================
// Helper Functions
// ============================================================================

struct Harness {
    addr: SocketAddr,
    state: Arc<AppState>,
    stop: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start(device_port: u16) -> Self {
        let config = ServiceConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            switcher: fast_config(device_port),
            collaboration: fast_config(device_port),
        };

        let state = Arc::new(AppState::start(&config).unwrap());
        let server = HttpServer::bind(config.listen_addr).await.unwrap();
        let addr = server.local_addr();

        let (stop, stopped) = oneshot::channel::<()>();
        let serving = Arc::clone(&state);
        let server = tokio::spawn(async move {
            server
                .serve(serving, async move {
                    let _ = stopped.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            stop,
            server,
        }
    }

    async fn request(&self, method: &str, path: &str) -> (u16, Value) {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        let request = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        let status = head
            .split_whitespace()
            .nth(1)
            .unwrap()
            .parse::<u16>()
            .unwrap();

        assert!(head.contains("Content-Type: application/json"));
        (status, serde_json::from_str(body).unwrap())
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        self.server.await.unwrap();
        self.state.shutdown().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_route_request_end_to_end() {
    let device = SimDevice::switcher(None).await;
    let harness = Harness::start(device.port).await;

    let (status, body) = harness
        .request("PUT", "/videoswitcher/route/2/3/127.0.0.1/false")
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["input"], "2:3");
    assert_eq!(body["output"], "3");
    assert_eq!(device.received(), vec!["Route 3 4\r\n".to_string()]);

    // Pooled connection is reused by the next request.
    let (status, body) = harness
        .request("GET", "/videoswitcher/input/127.0.0.1/3/false")
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["input"], "2:3");
    assert_eq!(device.accepts(), 1);

    harness.stop().await;
}

#[tokio::test]
async fn test_front_lock_returns_success() {
    let device = SimDevice::switcher(None).await;
    let harness = Harness::start(device.port).await;

    let (status, body) = harness
        .request("PUT", "/videoswitcher/frontlock/127.0.0.1/true/false")
        .await;

    assert_eq!(status, 200);
    assert_eq!(body, Value::String("Success".into()));
    assert_eq!(device.received(), vec!["Lock On\r\n".to_string()]);

    harness.stop().await;
}

#[tokio::test]
async fn test_signal_uses_welcome_connection() {
    let device = SimDevice::switcher(Some("Welcome\r")).await;
    let harness = Harness::start(device.port).await;

    let (status, body) = harness
        .request("GET", "/videoswitcher/signal/127.0.0.1/0")
        .await;

    assert_eq!(status, 200);
    assert_eq!(body, Value::String("Signal|1|1".into()));
    assert_eq!(harness.state.switcher().channel().pool().connection_count(), 0);

    harness.stop().await;
}

#[tokio::test]
async fn test_invalid_welcome_flag_does_no_io() {
    let device = SimDevice::switcher(None).await;
    let harness = Harness::start(device.port).await;

    let (status, body) = harness
        .request("PUT", "/videoswitcher/route/2/3/127.0.0.1/maybe")
        .await;

    assert_eq!(status, 400);
    assert!(body.as_str().unwrap().contains("welcome"));
    assert_eq!(device.accepts(), 0);

    harness.stop().await;
}

#[tokio::test]
async fn test_device_error_is_server_error() {
    let device = SimDevice::start(None, |_| Some("Error|Bad port\n".to_string())).await;
    let harness = Harness::start(device.port).await;

    let (status, body) = harness
        .request("GET", "/videoswitcher/input/127.0.0.1/3/false")
        .await;

    assert_eq!(status, 500);
    assert!(body.as_str().unwrap().contains("Bad port"));

    harness.stop().await;
}

#[tokio::test]
async fn test_unknown_route_and_wrong_method() {
    let device = SimDevice::switcher(None).await;
    let harness = Harness::start(device.port).await;

    let (status, _) = harness.request("GET", "/nowhere").await;
    assert_eq!(status, 404);

    let (status, _) = harness
        .request("GET", "/videoswitcher/route/2/3/127.0.0.1/false")
        .await;
    assert_eq!(status, 405);

    let (status, body) = harness.request("GET", "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body, Value::String("ok".into()));

    harness.stop().await;
}
