//! # MCP Server
//!
//! [`McpServer`] holds the server identity and the ordered tool catalog, and
//! answers the MCP methods this server supports:
//!
//! * `initialize` and `notifications/initialized`
//! * `ping`
//! * `tools/list`
//! * `tools/call`
//!
//! ## Examples
//!
//! ```rust,no_run
//! use grok_mcp::server::McpServer;
//! use grok_mcp::server::tool::ToolBuilder;
//! use grok_mcp::transport::ServerStdioTransport;
//! use grok_mcp::types::Implementation;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = McpServer::new(Implementation {
//!     name: "example-server".to_string(),
//!     version: "1.0.0".to_string(),
//! });
//!
//! server.register_tool(
//!     ToolBuilder::new("hello")
//!         .build_fallible(|_: serde_json::Value| async move {
//!             Ok::<_, serde_json::Error>("hi".to_string())
//!         }),
//! );
//!
//! server.serve(ServerStdioTransport::default()).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::protocol::{Protocol, ProtocolBuilder};
use crate::server::{
    error::{ErrorCode, ServerError},
    tool::RegisteredTool,
};
use crate::transport::Transport;
use crate::types::{
    CallToolRequest, CallToolResponse, Implementation, InitializeRequest, InitializeResponse,
    ListRequest, ServerCapabilities, Tool, ToolCapabilities, ToolsListResponse,
    LATEST_PROTOCOL_VERSION,
};

type Result<T> = std::result::Result<T, ServerError>;

/// MCP server exposing a fixed, ordered set of tools
///
/// The catalog is a plain vector so `tools/list` always returns tools in
/// registration order.
pub struct McpServer {
    server_info: Implementation,
    capabilities: ServerCapabilities,
    tools: Vec<RegisteredTool>,
}

impl McpServer {
    /// Create a new MCP server with the given implementation info
    pub fn new(server_info: Implementation) -> Self {
        Self {
            server_info,
            capabilities: ServerCapabilities::default(),
            tools: Vec::new(),
        }
    }

    /// Server name and version reported by `initialize`
    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Register a tool
    ///
    /// A tool registered under an existing name replaces the earlier one in
    /// place. Registering the first tool turns on the `tools` capability.
    pub fn register_tool(&mut self, tool: RegisteredTool) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => {
                warn!("Replacing already registered tool '{}'", tool.name());
                *existing = tool;
            }
            None => {
                debug!("Registered tool '{}'", tool.name());
                self.tools.push(tool);
            }
        }

        if self.capabilities.tools.is_none() {
            self.capabilities.tools = Some(ToolCapabilities::default());
        }
    }

    /// Answer an `initialize` request
    pub fn initialize(&self, request: &InitializeRequest) -> InitializeResponse {
        info!(
            "Client '{}' {} connected (protocol {})",
            request.client_info.name, request.client_info.version, request.protocol_version
        );
        InitializeResponse {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: None,
        }
    }

    /// Metadata of every registered tool, in registration order
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.metadata.clone()).collect()
    }

    /// Invoke a tool by name
    ///
    /// # Errors
    ///
    /// Returns a `MethodNotFound` error when no tool with that name is
    /// registered. Failures inside a tool are reported through the returned
    /// [`CallToolResponse`] instead.
    pub async fn call_tool(&self, request: CallToolRequest) -> Result<CallToolResponse> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == request.name)
            .ok_or_else(|| {
                ServerError::new(
                    ErrorCode::MethodNotFound,
                    format!("Unknown tool: {}", request.name),
                )
            })?;

        debug!("Calling tool '{}'", request.name);
        Ok(tool.call(request.arguments).await)
    }

    /// Bind the server's request handlers to a transport
    pub fn into_protocol<T: Transport>(self: Arc<Self>, transport: T) -> Protocol<T> {
        let init_server = Arc::clone(&self);
        let list_server = Arc::clone(&self);
        let call_server = self;

        ProtocolBuilder::new(transport)
            .request_handler("initialize", move |request: InitializeRequest| {
                let response = init_server.initialize(&request);
                Box::pin(async move { Ok(response) })
            })
            .notification_handler("notifications/initialized", |_: serde_json::Value| {
                Box::pin(async move {
                    debug!("Client finished initialization");
                    Ok(())
                })
            })
            .request_handler("ping", |_: serde_json::Value| {
                Box::pin(async move { Ok(json!({})) })
            })
            .request_handler("tools/list", move |_: Option<ListRequest>| {
                let tools = list_server.list_tools();
                Box::pin(async move {
                    Ok(ToolsListResponse {
                        tools,
                        next_cursor: None,
                    })
                })
            })
            .request_handler("tools/call", move |request: CallToolRequest| {
                let server = Arc::clone(&call_server);
                Box::pin(async move { server.call_tool(request).await })
            })
            .build()
    }

    /// Open the transport and serve requests until it reaches end of stream
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to open, receive or send.
    pub async fn serve<T: Transport>(self, transport: T) -> Result<()> {
        transport.open().await?;
        info!(
            "Serving {} {} with {} tools",
            self.server_info.name,
            self.server_info.version,
            self.tools.len()
        );
        let protocol = Arc::new(self).into_protocol(transport);
        protocol.listen().await?;
        info!("Client disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::tool::ToolBuilder;
    use crate::types::Content;

    fn server() -> McpServer {
        let mut server = McpServer::new(Implementation {
            name: "test-server".to_string(),
            version: "0.0.1".to_string(),
        });
        for name in ["beta", "alpha", "gamma"] {
            server.register_tool(ToolBuilder::new(name).build(move |_| async move {
                CallToolResponse::success(name)
            }));
        }
        server
    }

    #[test]
    fn test_list_tools_keeps_registration_order() {
        let names: Vec<_> = server().list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["beta", "alpha", "gamma"]);
    }

    #[test]
    fn test_initialize_advertises_tools() {
        let response = server().initialize(&InitializeRequest::default());
        assert_eq!(response.protocol_version, LATEST_PROTOCOL_VERSION);
        assert_eq!(response.server_info.name, "test-server");
        let capabilities = serde_json::to_value(&response.capabilities).unwrap();
        assert_eq!(capabilities, json!({"tools": {}}));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut server = server();
        server.register_tool(
            ToolBuilder::new("alpha")
                .description("second alpha")
                .build(|_| async move { CallToolResponse::success("replaced") }),
        );
        let tools = server.list_tools();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[1].description.as_deref(), Some("second alpha"));
    }

    #[tokio::test]
    async fn test_call_tool_dispatches_by_name() {
        let response = server()
            .call_tool(CallToolRequest {
                name: "gamma".to_string(),
                arguments: None,
                meta: None,
            })
            .await
            .unwrap();
        assert_eq!(response.content, vec![Content::Text { text: "gamma".to_string() }]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_a_protocol_error() {
        let err = server()
            .call_tool(CallToolRequest {
                name: "delta".to_string(),
                arguments: None,
                meta: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MethodNotFound));
        assert_eq!(err.to_rpc_error().message, "Unknown tool: delta");
    }
}
