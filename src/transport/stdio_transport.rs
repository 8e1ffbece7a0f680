//! Standard I/O (stdio) transport
//!
//! MCP hosts launch local servers as child processes and exchange
//! newline-delimited JSON-RPC messages over the child's stdin/stdout.
//! `ServerStdioTransport` is the server side of that arrangement.
//!
//! Stdout is reserved for protocol frames; diagnostics go to stderr through
//! `tracing`.

use super::error::{TransportError, TransportErrorCode};
use super::Result;
use super::{Message, RequestId, Transport};
use crate::server::error::ErrorCode;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tracing::debug;

/// Server-side stdio transport implementation
///
/// Each message is a single line of JSON text followed by a newline.
/// Blank lines are skipped. A line that is not a JSON-RPC message is
/// reported as [`TransportError::Malformed`] (see [`decode_frame`]) and
/// reading continues with the next line. After [`Transport::close`] the transport reports end of stream and
/// refuses to send.
///
/// # Examples
///
/// ```no_run
/// use grok_mcp::transport::{ServerStdioTransport, Transport};
///
/// async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
///     let transport = ServerStdioTransport::default();
///     transport.open().await?;
///
///     while let Some(message) = transport.receive().await? {
///         transport.send(&message).await?;
///     }
///
///     transport.close().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ServerStdioTransport {
    stdin: Arc<Mutex<BufReader<Stdin>>>,
    stdout: Arc<Mutex<Stdout>>,
    closed: Arc<AtomicBool>,
}

impl Default for ServerStdioTransport {
    fn default() -> Self {
        Self {
            stdin: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()))),
            stdout: Arc::new(Mutex::new(tokio::io::stdout())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Transport for ServerStdioTransport {
    /// Reads the next JSON-RPC message from stdin
    ///
    /// Returns `Ok(None)` on EOF or once the transport has been closed.
    async fn receive(&self) -> Result<Option<Message>> {
        let mut stdin = self.stdin.lock().await;
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Ok(None);
            }

            let mut frame = Vec::new();
            let bytes_read = stdin.read_until(b'\n', &mut frame).await?;
            if bytes_read == 0 {
                debug!("stdin reached EOF");
                return Ok(None);
            }

            if let Some(message) = decode_frame(&frame)? {
                debug!("Received: {:?}", message);
                return Ok(Some(message));
            }
        }
    }

    /// Writes one JSON-RPC message to stdout and flushes
    async fn send(&self, message: &Message) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::new(
                TransportErrorCode::ConnectionClosed,
                "stdio transport is closed",
            ));
        }

        let serialized = serde_json::to_string(message)?;
        debug!("Sending: {serialized}");
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(serialized.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn open(&self) -> Result<()> {
        self.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Marks the transport closed and flushes anything still buffered on stdout
    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("Closing stdio transport");
        self.stdout.lock().await.flush().await?;
        Ok(())
    }
}

/// Decode one newline-delimited frame
///
/// Returns `Ok(None)` for a blank frame. Bytes that are not JSON (including
/// invalid UTF-8) give a parse error (-32700); JSON that is not a JSON-RPC
/// message gives an invalid request error (-32600) carrying the frame's id
/// when it has a readable one.
pub fn decode_frame(frame: &[u8]) -> Result<Option<Message>> {
    let frame = trim_ascii_whitespace(frame);
    if frame.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(frame).map_err(|e| {
        TransportError::malformed(None, ErrorCode::ParseError as i32, format!("Parse error: {}", e))
    })?;
    let id = value
        .get("id")
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

    serde_json::from_value(value).map(Some).map_err(|e| {
        TransportError::malformed(id, ErrorCode::InvalidRequest as i32, format!("Invalid request: {}", e))
    })
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
