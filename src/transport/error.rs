use std::fmt;
use thiserror::Error;

use super::{JsonRpcError, RequestId};

/// Transport-specific error codes
///
/// # Error Code Ranges
///
/// - `-1000` to `-1099`: Connection errors
/// - `-1100` to `-1199`: Message errors
/// - `-1900` to `-1999`: Generic errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorCode {
    // Connection errors
    /// Connection was closed
    ConnectionClosed = -1001,

    // Message errors
    /// Message format is invalid
    InvalidMessage = -1101,
    /// Failed to send message
    MessageSendFailed = -1102,
    /// Failed to receive message
    MessageReceiveFailed = -1103,

    // Generic errors
    /// Internal transport error
    InternalError = -1900,
    /// Transport operation timed out
    Timeout = -1901,
    /// Transport is in an invalid state
    InvalidState = -1902,
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "Connection was closed"),

            Self::InvalidMessage => write!(f, "Invalid message format"),
            Self::MessageSendFailed => write!(f, "Failed to send message"),
            Self::MessageReceiveFailed => write!(f, "Failed to receive message"),

            Self::InternalError => write!(f, "Internal error"),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::InvalidState => write!(f, "Invalid state"),
        }
    }
}

/// Transport-specific error type
///
/// Besides transport failures proper, this also carries JSON-RPC error
/// responses received by a client, so callers can tell a protocol-level
/// rejection apart from a broken connection.
///
/// # Examples
///
/// ```
/// use grok_mcp::transport::{TransportError, TransportErrorCode};
///
/// let error = TransportError::new(
///     TransportErrorCode::ConnectionClosed,
///     "stdio transport is closed"
/// );
/// assert_eq!(error.code(), Some(TransportErrorCode::ConnectionClosed));
/// ```
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{code}: {message}")]
    /// Transport-specific error
    Transport {
        /// The error code
        code: TransportErrorCode,
        /// Error message
        message: String,
    },

    #[error("JSON-RPC error {}: {}", .0.code, .0.message)]
    /// Error response returned by the remote endpoint
    Rpc(JsonRpcError),

    #[error("Malformed message: {}", .error.message)]
    /// A received frame that is not a valid JSON-RPC message
    ///
    /// The connection stays usable. The receiver answers with `error`,
    /// addressed to `id` when one could be recovered from the frame.
    Malformed {
        /// Id of the rejected request, if readable
        id: Option<RequestId>,
        /// Parse error (-32700) or invalid request (-32600)
        error: JsonRpcError,
    },

    #[error("JSON error: {0}")]
    /// JSON serialization/deserialization error
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    /// I/O error
    Io(#[from] std::io::Error),

    #[error("Channel error: {0}")]
    /// Channel communication error
    Channel(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TransportError {
    fn from(err: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::Channel(err.to_string())
    }
}

impl From<tokio::task::JoinError> for TransportError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Transport {
            code: TransportErrorCode::InternalError,
            message: err.to_string(),
        }
    }
}

impl TransportError {
    /// Create a new transport error
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self::Transport {
            code,
            message: message.into(),
        }
    }

    /// Create a [`TransportError::Malformed`] for a frame that failed to decode
    pub fn malformed(id: Option<RequestId>, code: i32, message: impl Into<String>) -> Self {
        Self::Malformed {
            id,
            error: JsonRpcError {
                code,
                message: message.into(),
                data: None,
            },
        }
    }

    /// Get the error code if this is a transport error
    ///
    /// # Examples
    ///
    /// ```
    /// use grok_mcp::transport::{TransportError, TransportErrorCode};
    ///
    /// let io_error = std::io::Error::new(std::io::ErrorKind::Other, "IO error");
    /// let error = TransportError::Io(io_error);
    /// assert_eq!(error.code(), None);
    /// ```
    pub fn code(&self) -> Option<TransportErrorCode> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The JSON-RPC error carried by this error, if the remote endpoint rejected a request
    pub fn rpc_error(&self) -> Option<&JsonRpcError> {
        match self {
            Self::Rpc(err) => Some(err),
            _ => None,
        }
    }
}
