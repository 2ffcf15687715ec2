//! HTTP/1.1 server loop.
//!
//! One task per connection, one request per connection. Only the request
//! line matters; headers are read and discarded, and any declared body is
//! drained so the socket closes cleanly.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

use super::handlers::{AppState, HttpResponse};
use super::router::Route;

// ============================================================================
// Constants
// ============================================================================

/// Deadline for receiving the full request head.
const REQUEST_HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest request head accepted.
const MAX_HEAD_BYTES: usize = 8 * 1024;

/// Largest request body drained.
const MAX_BODY_BYTES: u64 = 64 * 1024;

// ============================================================================
// HttpServer
// ============================================================================

/// A bound HTTP listener.
///
/// # Example
///
/// ```ignore
/// let state = Arc::new(AppState::start(&config)?);
/// let server = HttpServer::bind(config.listen_addr).await?;
/// server.serve(Arc::clone(&state), tokio::signal::ctrl_c().map(|_| ())).await?;
/// state.shutdown().await;
/// ```
pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl HttpServer {
    /// Binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "HTTP server bound");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the address actually bound.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts requests until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept errors are logged and skipped.
    pub async fn serve<F>(self, state: Arc<AppState>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(addr = %self.local_addr, "HTTP server listening");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("HTTP server shutting down");
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &state).await {
                                warn!(error = %e, %peer, "Connection handling failed");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                },
            }
        }

        Ok(())
    }
}

// ============================================================================
// Connection Handling
// ============================================================================

/// Parsed request line.
#[derive(Debug)]
struct RequestLine {
    method: String,
    path: String,
}

async fn handle_connection(stream: TcpStream, state: &AppState) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    let head = timeout(REQUEST_HEAD_TIMEOUT, read_head(&mut reader)).await;

    let response = match head {
        Err(_) => HttpResponse {
            status: 408,
            body: "request head timed out".into(),
        },
        Ok(Err(e)) => HttpResponse::from_error(&e),
        Ok(Ok((request, content_length))) => {
            drain_body(&mut reader, content_length).await?;

            match Route::resolve(&request.method, &request.path) {
                Ok(route) => state.handle(route).await,
                Err(e) => {
                    debug!(method = %request.method, path = %request.path, "No route");
                    HttpResponse::from_route_error(e)
                }
            }
        }
    };

    write.write_all(&render(&response)?).await?;
    write.shutdown().await?;
    Ok(())
}

/// Reads the request line and headers, returning the declared body length.
async fn read_head<R>(reader: &mut R) -> Result<(RequestLine, u64)>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0;
    let line = read_head_line(reader, &mut consumed).await?;

    let mut parts = line.split_whitespace();
    let (Some(method), Some(path), Some(_version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::invalid_argument("malformed request line"));
    };

    let request = RequestLine {
        method: method.to_string(),
        path: path.to_string(),
    };

    let mut content_length = 0;

    loop {
        let header = read_head_line(reader, &mut consumed).await?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }

        if let Some((name, value)) = header.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| Error::invalid_argument("invalid Content-Length"))?;
        }
    }

    Ok((request, content_length))
}

/// Reads one head line without letting the head exceed [`MAX_HEAD_BYTES`].
///
/// Returns an empty string at end of stream.
async fn read_head_line<R>(reader: &mut R, consumed: &mut usize) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let remaining = MAX_HEAD_BYTES.saturating_sub(*consumed);
    if remaining == 0 {
        return Err(Error::invalid_argument("request head too large"));
    }

    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(remaining as u64)
        .read_until(b'\n', &mut buf)
        .await?;
    *consumed += n;

    if n == remaining && !buf.ends_with(b"\n") {
        return Err(Error::invalid_argument("request head too large"));
    }

    String::from_utf8(buf).map_err(|_| Error::invalid_argument("request head is not valid UTF-8"))
}

async fn drain_body<R>(reader: &mut R, content_length: u64) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let limit = content_length.min(MAX_BODY_BYTES);
    let mut sink = tokio::io::sink();
    tokio::io::copy(&mut reader.take(limit), &mut sink).await?;
    Ok(())
}

fn render(response: &HttpResponse) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(&response.body)?;

    let mut bytes = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.reason(),
        body.len()
    )
    .into_bytes();

    bytes.extend_from_slice(&body);
    Ok(bytes)
}

// ============================================================================
// Tests
// ============================================================================
