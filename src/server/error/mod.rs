//! # Server Error Handling
//!
//! Error codes and the server error type. Errors raised by request handlers
//! are turned into JSON-RPC error responses; the [`ErrorCode`] carried by a
//! [`ServerError`] decides the `code` the client sees.
//!
//! Tool failures are *not* server errors: a tool that ran and failed reports
//! an error-flagged tool result. Only protocol-level problems (unknown method,
//! unknown tool, malformed parameters) travel through this type.
//!
//! ## Examples
//!
//! ```rust
//! use grok_mcp::server::error::{ErrorCode, ServerError};
//!
//! let error = ServerError::new(ErrorCode::MethodNotFound, "Unknown tool: nope");
//! assert_eq!(error.code(), Some(ErrorCode::MethodNotFound));
//!
//! let rpc = error.to_rpc_error();
//! assert_eq!(rpc.code, -32601);
//! assert_eq!(rpc.message, "Unknown tool: nope");
//! ```

use std::error::Error as StdError;
use std::fmt;

use crate::transport::{JsonRpcError, TransportError};

/// JSON-RPC error codes used by the server
///
/// * `ParseError` (-32700) - Invalid JSON was received by the server
/// * `InvalidRequest` (-32600) - The JSON sent is not a valid Request object
/// * `MethodNotFound` (-32601) - The method or tool does not exist
/// * `InvalidParams` (-32602) - Invalid method parameter(s)
/// * `InternalError` (-32603) - Internal JSON-RPC error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server
    ParseError = -32700,
    /// The JSON sent is not a valid Request object
    InvalidRequest = -32600,
    /// The method does not exist / is not available
    MethodNotFound = -32601,
    /// Invalid method parameter(s)
    InvalidParams = -32602,
    /// Internal JSON-RPC error
    InternalError = -32603,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::ParseError => write!(f, "Parse error"),
            ErrorCode::InvalidRequest => write!(f, "Invalid request"),
            ErrorCode::MethodNotFound => write!(f, "Method not found"),
            ErrorCode::InvalidParams => write!(f, "Invalid parameters"),
            ErrorCode::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Server-specific error type
///
/// # Variants
///
/// * `Transport` - Transport error
/// * `Json` - JSON serialization/deserialization error
/// * `Server` - Server error with code and message
#[derive(Debug)]
pub enum ServerError {
    /// Transport error
    Transport(TransportError),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Server error with code and message
    Server {
        /// The error code
        code: ErrorCode,
        /// Error message
        message: String,
    },
}

impl ServerError {
    /// Create a new server error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// Get the error code if this is a server error
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Convert into the JSON-RPC error object sent back to the client
    ///
    /// Server errors keep their own code and bare message; anything else is
    /// reported as an internal error.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            Self::Server { code, message, .. } => JsonRpcError {
                code: *code as i32,
                message: message.clone(),
                data: None,
            },
            other => JsonRpcError {
                code: ErrorCode::InternalError as i32,
                message: other.to_string(),
                data: None,
            },
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
            Self::Server { code, message, .. } => write!(f, "{}: {}", code, message),
        }
    }
}

// The wrapped transport or JSON error is already part of the message, so it
// is not exposed again as a source.
impl StdError for ServerError {}

impl From<TransportError> for ServerError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
