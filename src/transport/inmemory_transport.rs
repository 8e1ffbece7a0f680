//! In-memory transport
//!
//! A pair of Tokio channels standing in for a process boundary. The client side
//! spawns the server task when opened, which makes it possible to drive a
//! complete MCP session inside one process.
//!
//! # Examples
//!
//! ```
//! use grok_mcp::transport::{ClientInMemoryTransport, ServerInMemoryTransport, Transport};
//!
//! async fn echo_server(transport: ServerInMemoryTransport) {
//!     while let Ok(Some(message)) = transport.receive().await {
//!         let _ = transport.send(&message).await;
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ClientInMemoryTransport::new(|t| tokio::spawn(echo_server(t)));
//! transport.open().await?;
//! // ... exchange messages ...
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use super::error::{TransportError, TransportErrorCode};
use super::Result;
use super::{Message, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 100;

/// Server-side transport that receives messages from a channel
///
/// [`Transport::close`] releases a pending [`Transport::receive`] right away;
/// after it, `receive` reports end of stream and `send` fails.
#[derive(Clone)]
pub struct ServerInMemoryTransport {
    rx: Arc<Mutex<Receiver<Message>>>,
    tx: Sender<Message>,
    closed: Arc<watch::Sender<bool>>,
}

impl ServerInMemoryTransport {
    fn new(rx: Receiver<Message>, tx: Sender<Message>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
            tx,
            closed: Arc::new(watch::channel(false).0),
        }
    }

    async fn next_message(&self) -> Option<Message> {
        self.rx.lock().await.recv().await
    }
}

impl Default for ServerInMemoryTransport {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self::new(rx, tx)
    }
}

/// Resolves once the flag behind `closed` is set
async fn wait_closed(mut closed: watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            return;
        }
    }
}

#[async_trait]
impl Transport for ServerInMemoryTransport {
    async fn receive(&self) -> Result<Option<Message>> {
        tokio::select! {
            biased;
            _ = wait_closed(self.closed.subscribe()) => {
                debug!("Server transport closed");
                Ok(None)
            }
            message = self.next_message() => match message {
                Some(message) => {
                    debug!("Server received: {:?}", message);
                    Ok(Some(message))
                }
                None => {
                    debug!("Client channel closed");
                    Ok(None)
                }
            },
        }
    }

    async fn send(&self, message: &Message) -> Result<()> {
        if *self.closed.borrow() {
            return Err(TransportError::new(
                TransportErrorCode::ConnectionClosed,
                "in-memory transport is closed",
            ));
        }
        debug!("Server sending: {:?}", message);
        self.tx.send(message.clone()).await.map_err(|e| {
            TransportError::new(
                TransportErrorCode::MessageSendFailed,
                format!("Failed to send message: {}", e),
            )
        })?;
        Ok(())
    }

    async fn open(&self) -> Result<()> {
        self.closed.send_replace(false);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.send_replace(true);
        Ok(())
    }
}

type ServerFactory = Arc<dyn Fn(ServerInMemoryTransport) -> JoinHandle<()> + Send + Sync>;

/// Client-side transport that communicates with a spawned server task
#[derive(Clone)]
pub struct ClientInMemoryTransport {
    tx: Arc<Mutex<Option<Sender<Message>>>>,
    rx: Arc<Mutex<Option<Receiver<Message>>>>,
    server_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    server_factory: ServerFactory,
}

impl ClientInMemoryTransport {
    /// Creates a new in-memory transport with a server factory function
    ///
    /// The factory receives the server end of the channel pair when the
    /// transport is opened and returns the handle of the spawned server task.
    pub fn new<F>(server_factory: F) -> Self
    where
        F: Fn(ServerInMemoryTransport) -> JoinHandle<()> + Send + Sync + 'static,
    {
        Self {
            tx: Arc::new(Mutex::new(None)),
            rx: Arc::new(Mutex::new(None)),
            server_handle: Arc::new(Mutex::new(None)),
            server_factory: Arc::new(server_factory),
        }
    }
}

#[async_trait]
impl Transport for ClientInMemoryTransport {
    async fn receive(&self) -> Result<Option<Message>> {
        let mut rx_guard = self.rx.lock().await;
        let rx = rx_guard
            .as_mut()
            .ok_or_else(|| TransportError::new(TransportErrorCode::InvalidState, "Transport not opened"))?;

        match rx.recv().await {
            Some(message) => {
                debug!("Client received: {:?}", message);
                Ok(Some(message))
            }
            None => {
                debug!("Server channel closed");
                Ok(None)
            }
        }
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let tx_guard = self.tx.lock().await;
        let tx = tx_guard
            .as_ref()
            .ok_or_else(|| TransportError::new(TransportErrorCode::InvalidState, "Transport not opened"))?;

        debug!("Client sending: {:?}", message);
        tx.send(message.clone()).await.map_err(|e| {
            TransportError::new(
                TransportErrorCode::MessageSendFailed,
                format!("Failed to send message: {}", e),
            )
        })?;
        Ok(())
    }

    async fn open(&self) -> Result<()> {
        let (client_tx, server_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (server_tx, client_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let server_transport = ServerInMemoryTransport::new(server_rx, server_tx);

        let server_handle = (self.server_factory)(server_transport);

        *self.rx.lock().await = Some(client_rx);
        *self.tx.lock().await = Some(client_tx);
        *self.server_handle.lock().await = Some(server_handle);

        Ok(())
    }

    /// Closes the client end and waits for the server task to finish
    ///
    /// Dropping the sender first lets the server observe end of stream and
    /// exit, which in turn releases any receive pending on this side.
    async fn close(&self) -> Result<()> {
        *self.tx.lock().await = None;

        if let Some(handle) = self.server_handle.lock().await.take() {
            handle.await?;
        }

        *self.rx.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{JsonRpcMessage, JsonRpcRequest, JsonRpcVersion, RequestId};

    async fn echo_server(transport: ServerInMemoryTransport) {
        while let Ok(Some(message)) = transport.receive().await {
            if transport.send(&message).await.is_err() {
                break;
            }
        }
    }

    fn request(id: i64, method: &str) -> Message {
        JsonRpcMessage::Request(JsonRpcRequest {
            id: RequestId::Number(id),
            method: method.to_string(),
            params: Some(serde_json::json!({"index": id})),
            jsonrpc: JsonRpcVersion::default(),
        })
    }

    #[tokio::test]
    async fn test_async_transport() -> Result<()> {
        let transport = ClientInMemoryTransport::new(|t| tokio::spawn(echo_server(t)));
        transport.open().await?;

        let test_message = request(1, "ping");
        transport.send(&test_message).await?;

        let response = transport.receive().await?;
        assert_eq!(Some(test_message), response);

        transport.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_messages() -> Result<()> {
        let transport = ClientInMemoryTransport::new(|t| tokio::spawn(echo_server(t)));
        transport.open().await?;

        let messages: Vec<_> = (0..5).map(|i| request(i, &format!("test_{}", i))).collect();

        for msg in &messages {
            transport.send(msg).await?;
        }

        for expected in &messages {
            let received = transport.receive().await?;
            assert_eq!(Some(expected.clone()), received);
        }

        transport.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_send_before_open_fails() {
        let transport = ClientInMemoryTransport::new(|t| tokio::spawn(echo_server(t)));
        let err = transport.send(&request(1, "ping")).await.unwrap_err();
        assert_eq!(err.code(), Some(TransportErrorCode::InvalidState));
    }

    #[tokio::test]
    async fn test_close_releases_pending_receive() -> Result<()> {
        let transport = ClientInMemoryTransport::new(|t| tokio::spawn(echo_server(t)));
        transport.open().await?;

        let reader = transport.clone();
        let read_handle = tokio::spawn(async move { reader.receive().await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        transport.close().await?;

        let read_result = read_handle.await?;
        assert_eq!(read_result?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_server_close_releases_pending_receive() -> Result<()> {
        let transport = ServerInMemoryTransport::default();

        let reader = transport.clone();
        let read_handle = tokio::spawn(async move { reader.receive().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        tokio::time::timeout(std::time::Duration::from_secs(1), transport.close())
            .await
            .expect("close should not wait for a message")?;
        let read_result = tokio::time::timeout(std::time::Duration::from_secs(1), read_handle)
            .await
            .expect("pending receive should end after close")?;
        assert_eq!(read_result?, None);

        let err = transport.send(&request(1, "ping")).await.unwrap_err();
        assert_eq!(err.code(), Some(TransportErrorCode::ConnectionClosed));
        Ok(())
    }
}
