//! MCP client
//!
//! Drives an MCP server over any [`Transport`]: session initialization,
//! tool listing and tool calls. Used for in-process round trips and tests.

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    protocol::{Protocol, ProtocolBuilder, RequestOptions},
    transport::{Transport, TransportError, TransportErrorCode},
    types::{
        CallToolRequest, CallToolResponse, ClientCapabilities, Implementation, InitializeRequest,
        InitializeResponse, Tool, ToolsListResponse, LATEST_PROTOCOL_VERSION,
    },
};

type Result<T> = std::result::Result<T, TransportError>;

/// A client for interacting with an MCP server.
///
/// [`Client::start`] must be running (usually on a spawned task) for
/// responses to reach pending requests.
#[derive(Clone)]
pub struct Client<T: Transport> {
    protocol: Protocol<T>,
}

impl<T: Transport> Client<T> {
    /// Creates a new `ClientBuilder` with the given transport.
    pub fn builder(transport: T) -> ClientBuilder<T> {
        ClientBuilder::new(transport)
    }

    /// Performs the `initialize` handshake and sends `notifications/initialized`.
    pub async fn initialize(&self, client_info: Implementation) -> Result<InitializeResponse> {
        let request = InitializeRequest {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info,
        };
        let response = self
            .request(
                "initialize",
                Some(serde_json::to_value(request)?),
                RequestOptions::default(),
            )
            .await?;
        let response: InitializeResponse = serde_json::from_value(response)?;

        if response.protocol_version != LATEST_PROTOCOL_VERSION {
            return Err(TransportError::new(
                TransportErrorCode::InvalidMessage,
                format!("Unsupported protocol version: {}", response.protocol_version),
            ));
        }

        debug!(
            "Initialized with {} {}",
            response.server_info.name, response.server_info.version
        );
        self.protocol
            .notify("notifications/initialized", None)
            .await?;
        Ok(response)
    }

    /// Lists the server's tools.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let response = self
            .request("tools/list", None, RequestOptions::default())
            .await?;
        let response: ToolsListResponse = serde_json::from_value(response)?;
        Ok(response.tools)
    }

    /// Calls a tool by name.
    ///
    /// A tool that ran and failed still returns `Ok` with an error-flagged
    /// [`CallToolResponse`]; an unknown tool yields [`TransportError::Rpc`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResponse> {
        let request = CallToolRequest {
            name: name.to_string(),
            arguments,
            meta: None,
        };
        let response = self
            .request(
                "tools/call",
                Some(serde_json::to_value(request)?),
                RequestOptions::default(),
            )
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Sends a request and returns its result.
    ///
    /// A JSON-RPC error response is returned as [`TransportError::Rpc`].
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value> {
        let response = self.protocol.request(method, params, options).await?;
        if let Some(error) = response.error {
            return Err(TransportError::Rpc(error));
        }
        response.result.ok_or_else(|| {
            TransportError::new(
                TransportErrorCode::InvalidMessage,
                format!("Response to '{}' has neither result nor error", method),
            )
        })
    }

    /// Runs the receive loop until the transport closes.
    pub async fn start(&self) -> Result<()> {
        self.protocol.listen().await
    }

    /// Closes the underlying transport.
    pub async fn close(&self) -> Result<()> {
        self.protocol.transport().close().await
    }
}

/// A builder for creating `Client` instances.
pub struct ClientBuilder<T: Transport> {
    protocol: ProtocolBuilder<T>,
}

impl<T: Transport> ClientBuilder<T> {
    /// Creates a new `ClientBuilder` with the given transport.
    pub fn new(transport: T) -> Self {
        Self {
            protocol: ProtocolBuilder::new(transport),
        }
    }

    /// Builds and returns a new `Client` instance.
    pub fn build(self) -> Client<T> {
        Client {
            protocol: self.protocol.build(),
        }
    }
}
