//! # Grok Tools
//!
//! The three tools this server exposes, in catalog order:
//!
//! * `chat_completion`: text chat with a Grok model
//! * `image_understanding`: a question about one image
//! * `function_calling`: chat with caller-defined functions the model may call
//!
//! Each tool implements [`GrokTool`]: it declares its schema, receives typed
//! arguments and returns the text of the result. [`register_all`] wraps every
//! tool so that any failure (bad arguments, API error, empty response) ends
//! up as an error-flagged tool result reading `Error: <message>`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::server::tool::{RegisteredTool, ToolBuilder};
use crate::server::McpServer;
use crate::types::Implementation;
use crate::xai::{ChatCompletionResponse, Choice, ChatMessage, MessageContent, UpstreamError, XaiClient};

mod chat_completion;
mod function_calling;
mod image_understanding;

pub use chat_completion::{ChatCompletion, ChatCompletionArgs};
pub use function_calling::{FunctionCalling, FunctionCallingArgs};
pub use image_understanding::{ImageUnderstanding, ImageUnderstandingArgs};

/// Name reported in `initialize`
pub const SERVER_NAME: &str = "grok-mcp";

/// Why a tool invocation failed
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments were well-formed JSON but break a rule of the tool
    #[error("{0}")]
    Validation(String),
    /// Arguments did not match the tool's argument types
    #[error("Invalid arguments: {0}")]
    Arguments(#[from] serde_json::Error),
    /// The xAI API call failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    /// The API answered with something the tool cannot use
    #[error("{0}")]
    Response(String),
}

impl ToolError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// A tool backed by the xAI API
#[async_trait]
pub trait GrokTool: Send + Sync + 'static {
    /// Typed arguments, deserialized from the `tools/call` arguments object
    type Args: DeserializeOwned + Send + 'static;

    /// Tool name, unique within the catalog
    const NAME: &'static str;

    /// Human-readable description shown to the client
    fn description(&self) -> &'static str;

    /// JSON Schema of the arguments
    fn input_schema(&self) -> Value;

    /// Validate the arguments, call the API and produce the result text
    async fn invoke(&self, client: &XaiClient, args: Self::Args) -> Result<String, ToolError>;
}

/// Wrap a [`GrokTool`] into a tool the server can register
pub fn registered<T: GrokTool>(tool: T, client: XaiClient) -> RegisteredTool {
    let builder = ToolBuilder::new(T::NAME)
        .description(tool.description())
        .input_schema(tool.input_schema());
    let tool = Arc::new(tool);
    builder.build_fallible(move |args: T::Args| {
        let tool = Arc::clone(&tool);
        let client = client.clone();
        async move { tool.invoke(&client, args).await }
    })
}

/// Register the three Grok tools in catalog order
pub fn register_all(server: &mut McpServer, client: &XaiClient) {
    server.register_tool(registered(ChatCompletion, client.clone()));
    server.register_tool(registered(ImageUnderstanding, client.clone()));
    server.register_tool(registered(FunctionCalling, client.clone()));
}

/// An MCP server named `grok-mcp` with every Grok tool registered
pub fn server(client: &XaiClient) -> McpServer {
    let mut server = McpServer::new(Implementation {
        name: SERVER_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    });
    register_all(&mut server, client);
    server
}

fn first_choice(response: &ChatCompletionResponse) -> Result<&Choice, ToolError> {
    response
        .choices
        .first()
        .ok_or_else(|| ToolError::Response("xAI response contained no choices".to_string()))
}

/// Text of the first choice; a `null` content reads as empty
fn first_choice_text(response: &ChatCompletionResponse) -> Result<String, ToolError> {
    Ok(first_choice(response)?.message.content.clone().unwrap_or_default())
}

fn require_messages(messages: Option<Vec<ChatMessage>>) -> Result<Vec<ChatMessage>, ToolError> {
    match messages {
        Some(messages) if !messages.is_empty() => Ok(messages),
        _ => Err(ToolError::validation("messages must be a non-empty array")),
    }
}

fn require_text_content(index: usize, message: &ChatMessage) -> Result<(), ToolError> {
    match &message.content {
        Some(MessageContent::Text(_)) => Ok(()),
        Some(MessageContent::Parts(_)) => Err(ToolError::validation(format!(
            "messages[{index}].content must be a string"
        ))),
        None => Err(ToolError::validation(format!("messages[{index}].content is required"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn message_schema(roles: &[&str]) -> Value {
    serde_json::json!({
        "type": "array",
        "minItems": 1,
        "description": "Conversation messages, oldest first",
        "items": {
            "type": "object",
            "properties": {
                "role": { "type": "string", "enum": roles },
                "content": { "type": "string" }
            },
            "required": ["role", "content"]
        }
    })
}

fn model_schema(default: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": format!("Grok model id (default: {default})"),
        "default": default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::XaiConfig;

    #[test]
    fn test_catalog_order_and_schemas() {
        let client = XaiClient::new(XaiConfig::new("test-key").unwrap()).unwrap();
        let tools = server(&client).list_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["chat_completion", "image_understanding", "function_calling"]);
        for tool in &tools {
            assert!(tool.description.is_some());
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_catalog_listing_is_stable() {
        let client = XaiClient::new(XaiConfig::new("test-key").unwrap()).unwrap();
        let server = server(&client);
        let first = serde_json::to_string(&server.list_tools()).unwrap();
        let second = serde_json::to_string(&server.list_tools()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ToolError::validation("messages must be a non-empty array").to_string(),
            "messages must be a non-empty array"
        );
        let err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        assert!(ToolError::from(err).to_string().starts_with("Invalid arguments: "));
    }

    #[test]
    fn test_missing_choices() {
        let response: ChatCompletionResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert_eq!(
            first_choice_text(&response).unwrap_err().to_string(),
            "xAI response contained no choices"
        );
    }
}
