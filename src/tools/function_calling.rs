use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{first_choice, model_schema, require_messages, GrokTool, ToolError};
use crate::xai::{
    AssistantMessage, ChatMessage, FunctionCallOptions, MessageContent, Role, ToolChoice, Usage,
    XaiClient, DEFAULT_CHAT_MODEL,
};

/// Arguments of `function_calling`
#[derive(Debug, Deserialize)]
pub struct FunctionCallingArgs {
    /// Conversation so far, including earlier tool calls and results
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    /// Function definitions offered to the model, forwarded verbatim
    #[serde(default)]
    pub tools: Option<Vec<Value>>,
    /// Whether the model may, must or must not call a function
    #[serde(default)]
    pub tool_choice: Option<ToolChoice>,
    /// Model id
    #[serde(default)]
    pub model: Option<String>,
    /// Anything else, forwarded to the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Chat with functions the model may ask the caller to run
pub struct FunctionCalling;

#[derive(Serialize)]
struct ToolCallReport<'a> {
    message: &'a AssistantMessage,
    usage: &'a Option<Usage>,
}

impl FunctionCalling {
    /// Check the arguments and turn them into API inputs
    pub fn prepare(
        args: FunctionCallingArgs,
    ) -> Result<(Vec<ChatMessage>, Vec<Value>, FunctionCallOptions), ToolError> {
        let messages = require_messages(args.messages)?;
        for (index, message) in messages.iter().enumerate() {
            validate_message(index, message)?;
        }

        let tools = match args.tools {
            Some(tools) if !tools.is_empty() => tools,
            _ => return Err(ToolError::validation("tools must be a non-empty array")),
        };

        Ok((
            messages,
            tools,
            FunctionCallOptions {
                model: args.model,
                tool_choice: args.tool_choice,
                extra: args.extra,
            },
        ))
    }

    /// Result text for the model's reply
    ///
    /// A reply with tool calls is returned as pretty-printed
    /// `{"message": ..., "usage": ...}` so the caller can run the calls;
    /// otherwise the reply's text is returned as is.
    pub fn render(message: &AssistantMessage, usage: &Option<Usage>) -> Result<String, ToolError> {
        if message.has_tool_calls() {
            serde_json::to_string_pretty(&ToolCallReport { message, usage })
                .map_err(|e| ToolError::Response(format!("failed to encode tool calls: {e}")))
        } else {
            Ok(message.content.clone().unwrap_or_default())
        }
    }
}

fn validate_message(index: usize, message: &ChatMessage) -> Result<(), ToolError> {
    if message.role == Role::Tool && message.tool_call_id.as_deref().map_or(true, str::is_empty) {
        return Err(ToolError::validation(format!(
            "messages[{index}]: tool messages require tool_call_id"
        )));
    }

    match &message.content {
        Some(MessageContent::Text(_)) => Ok(()),
        Some(MessageContent::Parts(_)) => Err(ToolError::validation(format!(
            "messages[{index}].content must be a string"
        ))),
        None if message.role == Role::Assistant && message.has_tool_calls() => Ok(()),
        None => Err(ToolError::validation(format!("messages[{index}].content is required"))),
    }
}

#[async_trait]
impl GrokTool for FunctionCalling {
    type Args = FunctionCallingArgs;

    const NAME: &'static str = "function_calling";

    fn description(&self) -> &'static str {
        "Let a Grok model decide whether to call one of the supplied functions"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "messages": {
                    "type": "array",
                    "minItems": 1,
                    "description": "Conversation messages, oldest first",
                    "items": {
                        "type": "object",
                        "properties": {
                            "role": { "type": "string", "enum": ["system", "user", "assistant", "tool"] },
                            "content": { "type": "string" },
                            "tool_call_id": {
                                "type": "string",
                                "description": "Id of the tool call answered by a tool message"
                            }
                        },
                        "required": ["role"]
                    }
                },
                "tools": {
                    "type": "array",
                    "minItems": 1,
                    "description": "Functions the model may call",
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": { "type": "string", "enum": ["function"] },
                            "function": {
                                "type": "object",
                                "properties": {
                                    "name": { "type": "string" },
                                    "description": { "type": "string" },
                                    "parameters": { "type": "object" }
                                },
                                "required": ["name"]
                            }
                        },
                        "required": ["type", "function"]
                    }
                },
                "tool_choice": {
                    "type": "string",
                    "enum": ["auto", "required", "none"],
                    "default": "auto",
                    "description": "Whether the model may, must or must not call a function"
                },
                "model": model_schema(DEFAULT_CHAT_MODEL)
            },
            "required": ["messages", "tools"]
        })
    }

    async fn invoke(&self, client: &XaiClient, args: FunctionCallingArgs) -> Result<String, ToolError> {
        let (messages, tools, options) = Self::prepare(args)?;
        let response = client.create_function_call(&messages, &tools, &options).await?;
        let choice = first_choice(&response)?;
        Self::render(&choice.message, &response.usage)
    }
}
