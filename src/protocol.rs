//! # JSON-RPC Protocol Layer
//!
//! The protocol layer sits between a [`Transport`] and the application. It
//! routes incoming requests and notifications to registered handlers,
//! correlates outgoing requests with their responses, and turns handler
//! failures into JSON-RPC error responses.
//!
//! Incoming messages are handled one at a time, in arrival order. A request
//! handler may await (for example on an upstream HTTP call); the next message
//! is read once it completes.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use grok_mcp::protocol::ProtocolBuilder;
//! use grok_mcp::transport::ServerStdioTransport;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let protocol = ProtocolBuilder::new(ServerStdioTransport::default())
//!     .request_handler("ping", |_: serde_json::Value| {
//!         Box::pin(async move { Ok(json!({})) })
//!     })
//!     .build();
//!
//! protocol.listen().await?;
//! # Ok(())
//! # }
//! ```

use crate::server::error::{ErrorCode, ServerError};
use crate::transport::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    RequestId, Transport, TransportError, TransportErrorCode,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::{
    collections::HashMap,
    sync::{atomic::AtomicI64, Arc},
};
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Result type for protocol operations
type Result<T> = std::result::Result<T, TransportError>;

/// Result type produced by request and notification handlers
pub type HandlerResult<T> = std::result::Result<T, ServerError>;

/// Bidirectional JSON-RPC endpoint bound to one transport
#[derive(Clone)]
pub struct Protocol<T: Transport> {
    transport: Arc<T>,
    request_id: Arc<AtomicI64>,
    pending_requests: Arc<Mutex<HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>>>,
    request_handlers: Arc<Mutex<HashMap<String, Box<dyn RequestHandler>>>>,
    notification_handlers: Arc<Mutex<HashMap<String, Box<dyn NotificationHandler>>>>,
}

impl<T: Transport> Protocol<T> {
    /// The transport this protocol is bound to
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a notification to the remote endpoint
    pub async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()> {
        let notification = JsonRpcNotification {
            method: method.to_string(),
            params,
            ..Default::default()
        };
        let msg = JsonRpcMessage::Notification(notification);
        self.transport.send(&msg).await?;
        Ok(())
    }

    /// Send a JSON-RPC request and wait for the matching response
    ///
    /// Someone must be running [`Protocol::listen`] on a clone of this
    /// protocol, otherwise the response is never routed back.
    ///
    /// # Errors
    ///
    /// * The transport fails to send the request
    /// * The request times out (`TransportErrorCode::Timeout`)
    /// * The listen loop stops before a response arrives
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> Result<JsonRpcResponse> {
        let id = RequestId::Number(self.request_id.fetch_add(1, Ordering::SeqCst));

        let (tx, rx) = oneshot::channel();
        self.pending_requests.lock().await.insert(id.clone(), tx);

        let msg = JsonRpcMessage::Request(JsonRpcRequest {
            id: id.clone(),
            method: method.to_string(),
            params,
            ..Default::default()
        });
        if let Err(e) = self.transport.send(&msg).await {
            self.pending_requests.lock().await.remove(&id);
            return Err(e);
        }

        match timeout(options.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(TransportError::new(
                TransportErrorCode::MessageReceiveFailed,
                "Request cancelled",
            )),
            Err(_) => {
                self.pending_requests.lock().await.remove(&id);
                Err(TransportError::new(
                    TransportErrorCode::Timeout,
                    format!("Request '{}' timed out", method),
                ))
            }
        }
    }

    /// Listen for and handle incoming JSON-RPC messages
    ///
    /// Runs until the transport reports end of stream. Frames the transport
    /// rejects as malformed are answered with their JSON-RPC error and the
    /// loop keeps going.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to receive or send a message.
    pub async fn listen(&self) -> Result<()> {
        debug!("Listening for requests");
        loop {
            let message = match self.transport.receive().await {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(TransportError::Malformed { id, error }) => {
                    warn!("Rejecting malformed message: {}", error.message);
                    self.transport
                        .send(&JsonRpcMessage::Response(error_response(id, error)))
                        .await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match message {
                JsonRpcMessage::Request(request) => self.handle_request(request).await?,
                JsonRpcMessage::Response(response) => {
                    let mut pending = self.pending_requests.lock().await;
                    let tx = response.id.as_ref().and_then(|id| pending.remove(id));
                    match tx {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => debug!("Dropping response for unknown request id {:?}", response.id),
                    }
                }
                JsonRpcMessage::Notification(notification) => {
                    let handlers = self.notification_handlers.lock().await;
                    match handlers.get(&notification.method) {
                        Some(handler) => {
                            if let Err(e) = handler.handle(notification).await {
                                warn!("Notification handler failed: {}", e);
                            }
                        }
                        None => debug!("Ignoring notification '{}'", notification.method),
                    }
                }
            }
        }
        debug!("Transport closed, listen loop finished");
        Ok(())
    }

    /// Route a request to its handler and send the response
    async fn handle_request(&self, request: JsonRpcRequest) -> Result<()> {
        let id = request.id.clone();
        let method = request.method.clone();

        let outcome = {
            let handlers = self.request_handlers.lock().await;
            match handlers.get(&method) {
                Some(handler) => handler.handle(request).await,
                None => Err(ServerError::new(
                    ErrorCode::MethodNotFound,
                    format!("Method not found: {}", method),
                )),
            }
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!("Request '{}' (id {}) failed: {}", method, id, e);
                error_response(Some(id), e.to_rpc_error())
            }
        };

        self.transport
            .send(&JsonRpcMessage::Response(response))
            .await
    }
}

fn error_response(id: Option<RequestId>, error: JsonRpcError) -> JsonRpcResponse {
    JsonRpcResponse {
        id,
        result: None,
        error: Some(error),
        ..Default::default()
    }
}

/// The default request timeout, in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MSEC: u64 = 60000;

/// Options for outgoing requests
///
/// ```rust
/// use grok_mcp::protocol::RequestOptions;
/// use std::time::Duration;
///
/// let options = RequestOptions::default().timeout(Duration::from_secs(30));
/// ```
pub struct RequestOptions {
    timeout: Duration,
}

impl RequestOptions {
    /// Set the timeout duration for the request
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MSEC),
        }
    }
}

/// Builder for creating and configuring a Protocol instance
pub struct ProtocolBuilder<T: Transport> {
    transport: T,
    request_handlers: HashMap<String, Box<dyn RequestHandler>>,
    notification_handlers: HashMap<String, Box<dyn NotificationHandler>>,
}

impl<T: Transport> ProtocolBuilder<T> {
    /// Creates a new ProtocolBuilder instance
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            request_handlers: HashMap::new(),
            notification_handlers: HashMap::new(),
        }
    }

    /// Register a typed request handler
    ///
    /// Parameters that fail to deserialize into `Req` are answered with an
    /// `InvalidParams` error without calling the handler. Absent parameters
    /// are deserialized from `null`, so `Option<_>` and `serde_json::Value`
    /// accept them.
    pub fn request_handler<Req, Resp>(
        mut self,
        method: &str,
        handler: impl Fn(Req) -> RequestFuture<Resp> + Send + Sync + 'static,
    ) -> Self
    where
        Req: DeserializeOwned + Send + Sync + 'static,
        Resp: Serialize + Send + Sync + 'static,
    {
        let handler = TypedRequestHandler {
            handler: Box::new(handler),
            _phantom: std::marker::PhantomData,
        };

        self.request_handlers
            .insert(method.to_string(), Box::new(handler));
        self
    }

    /// Register a handler for a notification method
    pub fn notification_handler<N>(
        mut self,
        method: &str,
        handler: impl Fn(N) -> NotificationFuture + Send + Sync + 'static,
    ) -> Self
    where
        N: DeserializeOwned + Send + Sync + 'static,
    {
        self.notification_handlers.insert(
            method.to_string(),
            Box::new(TypedNotificationHandler {
                handler: Box::new(handler),
                _phantom: std::marker::PhantomData,
            }),
        );
        self
    }

    /// Build the protocol instance with the configured handlers
    pub fn build(self) -> Protocol<T> {
        Protocol {
            transport: Arc::new(self.transport),
            request_handlers: Arc::new(Mutex::new(self.request_handlers)),
            notification_handlers: Arc::new(Mutex::new(self.notification_handlers)),
            request_id: Arc::new(AtomicI64::new(0)),
            pending_requests: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
trait RequestHandler: Send + Sync {
    async fn handle(&self, request: JsonRpcRequest) -> HandlerResult<JsonRpcResponse>;
}

#[async_trait]
trait NotificationHandler: Send + Sync {
    async fn handle(&self, notification: JsonRpcNotification) -> HandlerResult<()>;
}

/// Future returned by request handlers
pub type RequestFuture<T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = HandlerResult<T>> + Send>>;
/// Future returned by notification handlers
pub type NotificationFuture = RequestFuture<()>;

type AsyncRequestHandler<Req, Resp> = Box<dyn Fn(Req) -> RequestFuture<Resp> + Send + Sync>;
type AsyncNotificationHandler<N> = Box<dyn Fn(N) -> NotificationFuture + Send + Sync>;

fn decode_params<P: DeserializeOwned>(params: Option<serde_json::Value>) -> HandlerResult<P> {
    let params = params.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(params)
        .map_err(|e| ServerError::new(ErrorCode::InvalidParams, format!("Invalid params: {}", e)))
}

struct TypedRequestHandler<Req, Resp>
where
    Req: DeserializeOwned + Send + Sync + 'static,
    Resp: Serialize + Send + Sync + 'static,
{
    handler: AsyncRequestHandler<Req, Resp>,
    _phantom: std::marker::PhantomData<(Req, Resp)>,
}

#[async_trait]
impl<Req, Resp> RequestHandler for TypedRequestHandler<Req, Resp>
where
    Req: DeserializeOwned + Send + Sync + 'static,
    Resp: Serialize + Send + Sync + 'static,
{
    async fn handle(&self, request: JsonRpcRequest) -> HandlerResult<JsonRpcResponse> {
        let params: Req = decode_params(request.params)?;
        let result = (self.handler)(params).await?;
        Ok(JsonRpcResponse {
            id: Some(request.id),
            result: Some(serde_json::to_value(result)?),
            error: None,
            ..Default::default()
        })
    }
}

struct TypedNotificationHandler<N>
where
    N: DeserializeOwned + Send + Sync + 'static,
{
    handler: AsyncNotificationHandler<N>,
    _phantom: std::marker::PhantomData<N>,
}

#[async_trait]
impl<N> NotificationHandler for TypedNotificationHandler<N>
where
    N: DeserializeOwned + Send + Sync + 'static,
{
    async fn handle(&self, notification: JsonRpcNotification) -> HandlerResult<()> {
        let params: N = decode_params(notification.params)?;
        (self.handler)(params).await
    }
}
