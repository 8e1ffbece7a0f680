use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{first_choice_text, message_schema, model_schema, require_messages, require_text_content, GrokTool, ToolError};
use crate::xai::{
    ChatMessage, ChatOptions, Role, XaiClient, DEFAULT_CHAT_MODEL, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};

/// Arguments of `chat_completion`
#[derive(Debug, Deserialize)]
pub struct ChatCompletionArgs {
    /// Conversation so far
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    /// Model id
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature in `[0, 2]`
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Completion token limit
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Anything else, forwarded to the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Plain text chat with a Grok model
pub struct ChatCompletion;

impl ChatCompletion {
    /// Check the arguments and turn them into API inputs
    pub fn prepare(args: ChatCompletionArgs) -> Result<(Vec<ChatMessage>, ChatOptions), ToolError> {
        let messages = require_messages(args.messages)?;
        for (index, message) in messages.iter().enumerate() {
            if message.role == Role::Tool {
                return Err(ToolError::validation(format!(
                    "messages[{index}].role '{}' is not supported by chat_completion",
                    message.role.as_str()
                )));
            }
            require_text_content(index, message)?;
        }
        validate_sampling(args.temperature, args.max_tokens)?;

        Ok((
            messages,
            ChatOptions {
                model: args.model,
                temperature: args.temperature,
                max_tokens: args.max_tokens,
                extra: args.extra,
            },
        ))
    }
}

pub(crate) fn validate_sampling(temperature: Option<f64>, max_tokens: Option<u32>) -> Result<(), ToolError> {
    if let Some(t) = temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(ToolError::validation(format!(
                "temperature must be between 0 and 2, got {t}"
            )));
        }
    }
    if max_tokens == Some(0) {
        return Err(ToolError::validation("max_tokens must be greater than 0"));
    }
    Ok(())
}

#[async_trait]
impl GrokTool for ChatCompletion {
    type Args = ChatCompletionArgs;

    const NAME: &'static str = "chat_completion";

    fn description(&self) -> &'static str {
        "Generate a response from a Grok model for a conversation"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "messages": message_schema(&["system", "user", "assistant"]),
                "model": model_schema(DEFAULT_CHAT_MODEL),
                "temperature": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 2,
                    "default": DEFAULT_TEMPERATURE,
                    "description": "Sampling temperature (default: 1)"
                },
                "max_tokens": {
                    "type": "integer",
                    "minimum": 1,
                    "default": DEFAULT_MAX_TOKENS,
                    "description": "Maximum number of tokens to generate (default: 16384)"
                }
            },
            "required": ["messages"]
        })
    }

    async fn invoke(&self, client: &XaiClient, args: ChatCompletionArgs) -> Result<String, ToolError> {
        let (messages, options) = Self::prepare(args)?;
        let response = client.create_chat_completion(&messages, &options).await?;
        first_choice_text(&response)
    }
}
