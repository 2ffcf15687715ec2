//! Simulated telnet device shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use avswitch_control::{ChannelConfig, CommandChannel, ConnectionPool};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Maps one received command line (terminator stripped) to a reply.
///
/// `None` leaves the command unanswered.
pub type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A device listening on an ephemeral loopback port.
pub struct SimDevice {
    pub port: u16,
    accepts: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
}

impl SimDevice {
    /// Starts a device that answers through `responder`.
    pub async fn start<F>(banner: Option<&'static str>, responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let accepts = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);

        let accept_count = Arc::clone(&accepts);
        let log = Arc::clone(&received);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_count.fetch_add(1, Ordering::SeqCst);

                let responder = Arc::clone(&responder);
                let log = Arc::clone(&log);

                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    if let Some(banner) = banner
                        && write.write_all(banner.as_bytes()).await.is_err()
                    {
                        return;
                    }

                    let mut reader = BufReader::new(read);
                    loop {
                        let mut line = String::new();
                        match reader.read_line(&mut line).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {}
                        }

                        log.lock().push(line.clone());

                        let command = line.trim_end_matches(['\r', '\n']);
                        if let Some(reply) = responder(command)
                            && write.write_all(reply.as_bytes()).await.is_err()
                        {
                            break;
                        }
                    }
                });
            }
        });

        Self {
            port,
            accepts,
            received,
        }
    }

    /// Starts a switcher that acknowledges the standard vocabulary.
    pub async fn switcher(banner: Option<&'static str>) -> Self {
        Self::start(banner, switcher_reply).await
    }

    /// Connections accepted so far.
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// Raw lines received so far, terminators included.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }
}

/// Replies the way a matrix switcher does.
///
/// `Route a b` answers `Route|a`, `Route Get b` answers `Route|b-1`
/// (clamped at 1), `Lock x` echoes `Lock|x`, `Signal n` reports active,
/// `Hang` stays silent, anything else is an error.
pub fn switcher_reply(command: &str) -> Option<String> {
    let parts: Vec<&str> = command.split_whitespace().collect();

    let reply = match parts.as_slice() {
        ["Route", "Get", output] => {
            let output: u32 = output.parse().ok()?;
            format!("Route|{}\n", output.saturating_sub(1).max(1))
        }
        ["Route", input, _output] => format!("Route|{input}\n"),
        ["Lock", state] => format!("Lock|{state}\n"),
        ["Signal", port] => format!("Signal|{port}|1\n"),
        ["Hang"] => return None,
        _ => format!("Error|unknown command {command}\n"),
    };

    Some(reply)
}

/// Free loopback port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Channel settings for `port` with short test deadlines.
pub fn fast_config(port: u16) -> ChannelConfig {
    ChannelConfig::default()
        .with_device_port(port)
        .with_connect_timeout(Duration::from_millis(500))
        .with_banner_timeout(Duration::from_millis(300))
        .with_response_timeout(Duration::from_millis(300))
}

/// Channel on a fresh pool for `config`.
pub fn channel(config: ChannelConfig) -> CommandChannel {
    CommandChannel::new(ConnectionPool::start(config).unwrap())
}
