//! # Transport Layer
//!
//! The transport module carries JSON-RPC 2.0 messages between an MCP client and
//! this server. It defines the common [`Transport`] interface and two
//! implementations:
//!
//! * **Stdio Transport**: newline-delimited JSON over the process's stdin/stdout,
//!   the way MCP hosts launch local servers.
//! * **In-Memory Transport**: a pair of Tokio channels, used to drive the server
//!   from the same process (tests, embedding).
//!
//! ## Message Types
//!
//! * **Requests**: carry a method name, optional parameters and an id, and expect a response.
//! * **Responses**: carry either a result or an error for the request with the same id.
//! * **Notifications**: one-way messages without an id.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grok_mcp::transport::{ServerStdioTransport, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ServerStdioTransport::default();
//! transport.open().await?;
//!
//! if let Some(message) = transport.receive().await? {
//!     transport.send(&message).await?;
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod error;
pub use error::{TransportError, TransportErrorCode};

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

mod stdio_transport;
pub use stdio_transport::*;
mod inmemory_transport;
pub use inmemory_transport::*;

/// Message type used for MCP protocol communication
pub type Message = JsonRpcMessage;

#[async_trait]
/// Transport layer trait for handling MCP protocol communication
pub trait Transport: Send + Sync + 'static {
    /// Send a message to the remote endpoint
    ///
    /// # Errors
    ///
    /// - `TransportErrorCode::InvalidState` if the transport is not open
    /// - `TransportErrorCode::MessageSendFailed` if sending fails
    async fn send(&self, message: &Message) -> Result<()>;

    /// Receive the next message
    ///
    /// Returns `Ok(None)` once the connection has been closed normally.
    ///
    /// # Errors
    ///
    /// - `TransportErrorCode::InvalidState` if the transport is not open
    /// - `TransportError::Malformed` for a frame that is not a JSON-RPC
    ///   message; later frames can still be received
    /// - `TransportError::Io` if the underlying stream fails
    async fn receive(&self) -> Result<Option<Message>>;

    /// Open the transport connection
    async fn open(&self) -> Result<()>;

    /// Close the transport connection
    async fn close(&self) -> Result<()>;
}

/// Request ID used in JSON-RPC messages
///
/// JSON-RPC lets the caller pick either a number or a string. The id of a
/// request is echoed back unchanged in its response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id
    Number(i64),
    /// String id
    String(String),
}

impl Default for RequestId {
    fn default() -> Self {
        RequestId::Number(0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(id) => write!(f, "{}", id),
            RequestId::String(id) => write!(f, "{:?}", id),
        }
    }
}

/// JSON RPC version type
///
/// The default version is "2.0".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct JsonRpcVersion(String);

impl Default for JsonRpcVersion {
    fn default() -> Self {
        JsonRpcVersion("2.0".to_owned())
    }
}

impl JsonRpcVersion {
    /// Returns the string representation of the JSON-RPC version
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A JSON-RPC message that can be either a request, response, or notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// JSON-RPC response message
    Response(JsonRpcResponse),

    /// JSON-RPC request message
    Request(JsonRpcRequest),

    /// JSON-RPC notification message
    Notification(JsonRpcNotification),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
/// A JSON-RPC request message
pub struct JsonRpcRequest {
    /// The request ID, used to match responses to requests
    pub id: RequestId,

    /// The method name to invoke
    pub method: String,

    /// Optional parameters for the method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,

    /// The JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(default)]
/// A JSON-RPC notification message
pub struct JsonRpcNotification {
    /// The method name to invoke
    pub method: String,

    /// Optional parameters for the method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,

    /// The JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
/// A JSON-RPC response message
pub struct JsonRpcResponse {
    /// The request ID this response corresponds to
    ///
    /// `None` (serialized as `null`) when the request's id could not be read.
    pub id: Option<RequestId>,

    /// The result of the request, if successful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// The error, if the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,

    /// The JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
/// A JSON-RPC error object
pub struct JsonRpcError {
    /// Error code
    ///
    /// Standard JSON-RPC error codes are in the range -32768 to -32000.
    pub code: i32,

    /// A short description of the error
    pub message: String,

    /// Optional additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
