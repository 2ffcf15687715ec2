//! Frame codec.
//!
//! Works over any `AsyncRead`/`AsyncWrite` so the same code drives a
//! `TcpStream` in production and an in-memory duplex in tests.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

use crate::error::{Error, Result};

use super::Command;

// ============================================================================
// Constants
// ============================================================================

/// Terminates the welcome banner.
pub const CARRIAGE_RETURN: u8 = 0x0D;

/// Terminates a command response.
pub const LINE_FEED: u8 = 0x0A;

/// Read chunk size.
const CHUNK_SIZE: usize = 128;

// ============================================================================
// Writing
// ============================================================================

/// Writes one command frame and flushes it.
///
/// # Errors
///
/// Returns [`Error::Io`] if the write fails.
pub async fn write_command<W>(writer: &mut W, command: &Command) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    trace!(command = %command, "Writing command");
    writer.write_all(&command.to_wire()).await?;
    writer.flush().await?;
    Ok(())
}

// ============================================================================
// Reading
// ============================================================================

/// Reads chunks until `delimiter` shows up in the latest chunk.
///
/// The whole read is bounded by `deadline`. Null bytes are stripped from
/// the accumulated buffer before it is returned; bytes after the delimiter
/// in the final chunk are kept.
///
/// # Errors
///
/// - [`Error::Timeout`] if the deadline elapses first
/// - [`Error::ConnectionClosed`] if the peer closes before the delimiter
/// - [`Error::Io`] on any other read failure
pub async fn read_until<R>(reader: &mut R, delimiter: u8, deadline: Duration) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let message = timeout(deadline, read_frame(reader, delimiter)).await.map_err(|_| {
        Error::timeout(
            format!("waiting for delimiter 0x{delimiter:02X}"),
            deadline.as_millis() as u64,
        )
    })??;

    let cleaned = strip_nulls(message);
    trace!(bytes = cleaned.len(), "Frame read");
    Ok(cleaned)
}

/// Reads and returns the carriage-return terminated welcome banner.
///
/// # Errors
///
/// See [`read_until`].
pub async fn read_banner<R>(reader: &mut R, deadline: Duration) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let bytes = read_until(reader, CARRIAGE_RETURN, deadline).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads and returns the line-feed terminated response to a command.
///
/// # Errors
///
/// See [`read_until`].
pub async fn read_response<R>(reader: &mut R, deadline: Duration) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let bytes = read_until(reader, LINE_FEED, deadline).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn read_frame<R>(reader: &mut R, delimiter: u8) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut message = Vec::with_capacity(CHUNK_SIZE);

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }

        let received = &chunk[..n];
        message.extend_from_slice(received);

        if received.contains(&delimiter) {
            return Ok(message);
        }
    }
}

fn strip_nulls(mut bytes: Vec<u8>) -> Vec<u8> {
    bytes.retain(|&b| b != 0);
    bytes
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::duplex;

    const SHORT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_write_command_appends_crlf() {
        let (mut client, mut device) = duplex(64);
        let command = Command::new("Route").param1(3).param2(4);

        write_command(&mut client, &command).await.unwrap();
        drop(client);

        let mut received = Vec::new();
        device.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"Route 3 4\r\n");
    }

    #[tokio::test]
    async fn test_read_until_strips_nulls() {
        let (mut client, mut device) = duplex(64);
        device.write_all(b"Rou\0te|3\0\n").await.unwrap();

        let bytes = read_until(&mut client, LINE_FEED, SHORT).await.unwrap();
        assert_eq!(bytes, b"Route|3\n");
    }

    #[tokio::test]
    async fn test_read_until_spans_chunks() {
        let (mut client, mut device) = duplex(1024);
        let tail = tokio::spawn(async move {
            device.write_all(b"Signal|").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            device.write_all(b"4|1\n").await.unwrap();
            device
        });

        let response = read_response(&mut client, SHORT).await.unwrap();
        assert_eq!(response, "Signal|4|1\n");
        drop(tail.await.unwrap());
    }

    #[tokio::test]
    async fn test_banner_stops_at_carriage_return() {
        let (mut client, mut device) = duplex(64);
        device.write_all(b"Welcome to Kramer\r").await.unwrap();

        let banner = read_banner(&mut client, SHORT).await.unwrap();
        assert_eq!(banner, "Welcome to Kramer\r");
    }

    #[tokio::test]
    async fn test_read_until_times_out_without_delimiter() {
        let (mut client, mut device) = duplex(64);
        device.write_all(b"Route|3").await.unwrap();

        let err = read_until(&mut client, LINE_FEED, SHORT).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.is_transport_error());
    }

    #[tokio::test]
    async fn test_read_until_reports_closed_peer() {
        let (mut client, device) = duplex(64);
        drop(device);

        let err = read_until(&mut client, LINE_FEED, SHORT).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_exchange_against_scripted_device() {
        let mut device = tokio_test::io::Builder::new()
            .write(b"Route Get 4\r\n")
            .read(b"Route|")
            .read(b"3\n")
            .build();

        let command = Command::new("Route").param1("Get").param2(4);
        write_command(&mut device, &command).await.unwrap();

        let response = read_response(&mut device, SHORT).await.unwrap();
        assert_eq!(response, "Route|3\n");
    }

    #[test]
    fn test_strip_nulls() {
        assert_eq!(strip_nulls(vec![0, b'a', 0, b'b', 0]), b"ab");
        assert!(strip_nulls(vec![0; 8]).is_empty());
    }
}
