//! Chat-completion wire types
//!
//! Request messages and the response document of the xAI
//! `/chat/completions` endpoint, which follows the OpenAI chat format.
//! Every struct keeps unknown fields in an `extra` map so nothing the caller
//! or the API sends is dropped on the way through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
    /// Result of a tool call made by the model
    Tool,
}

impl Role {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// Message content: plain text or an ordered list of parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Mixed text and image parts
    Parts(Vec<ContentPart>),
}

/// One typed unit of a multi-part message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text fragment
    Text {
        /// The text
        text: String,
    },
    /// An image referenced by URL or data URI
    ImageUrl {
        /// The image reference
        image_url: ImageUrl,
    },
}

/// Image reference inside a [`ContentPart::ImageUrl`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    /// `http(s)` URL or `data:` URI
    pub url: String,
    /// Resolution the model should look at the image in
    pub detail: ImageDetail,
}

/// Image resolution hint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Let the model decide
    Auto,
    /// Low resolution
    Low,
    /// High resolution
    High,
}

/// A message sent to the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Author of the message
    pub role: Role,
    /// Message body; assistant messages carrying tool calls may omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    /// Id of the tool call a `tool` message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool calls previously requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Any other field, forwarded unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    /// A user message with the given content
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: Role::User,
            content: Some(content),
            tool_call_id: None,
            tool_calls: None,
            extra: Map::new(),
        }
    }

    /// Whether the message carries at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// How the model may use the offered tools
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides
    #[default]
    Auto,
    /// The model must call a tool
    Required,
    /// The model must not call a tool
    None,
}

/// A function call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Call id, echoed back in the `tool` message with the result
    pub id: String,
    /// Always `function`
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    /// Function name and arguments
    pub function: FunctionCall,
    /// Any other field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn function_type() -> String {
    "function".to_string()
}

/// Function name and JSON-encoded arguments of a [`ToolCall`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as a JSON string
    #[serde(default)]
    pub arguments: String,
}

/// Response document of `/chat/completions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    /// Completion id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Object type, `chat.completion`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Unix timestamp of creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    /// Model that produced the completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Candidate completions
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token accounting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Any other field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One candidate completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Position in `choices`
    #[serde(default)]
    pub index: u32,
    /// The generated message
    pub message: AssistantMessage,
    /// Why generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Any other field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message generated by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantMessage {
    /// Always `assistant` in practice
    #[serde(default = "assistant_role")]
    pub role: Role,
    /// Text content; `null` when the model only calls tools
    #[serde(default)]
    pub content: Option<String>,
    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Any other field (reasoning content, refusal, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn assistant_role() -> Role {
    Role::Assistant
}

impl AssistantMessage {
    /// Whether the model requested at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// Token accounting for one completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Usage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u64,
    /// Sum of both
    #[serde(default)]
    pub total_tokens: u64,
    /// Any other field (token details)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_message_wire_shape() {
        let message = ChatMessage::user(MessageContent::Parts(vec![
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "https://example.com/cat.png".to_string(),
                    detail: ImageDetail::High,
                },
            },
            ContentPart::Text {
                text: "What is this?".to_string(),
            },
        ]));

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": "https://example.com/cat.png", "detail": "high"}},
                    {"type": "text", "text": "What is this?"}
                ]
            })
        );
    }

    #[test]
    fn test_message_keeps_unknown_fields() {
        let message: ChatMessage =
            serde_json::from_value(json!({"role": "user", "content": "hi", "name": "ada"})).unwrap();
        assert_eq!(message.content, Some(MessageContent::Text("hi".to_string())));
        assert_eq!(message.extra.get("name"), Some(&json!("ada")));
        assert_eq!(serde_json::to_value(&message).unwrap()["name"], "ada");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "grok-3-mini-beta",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15, "reasoning_tokens": 3},
            "system_fingerprint": "fp_1"
        }))
        .unwrap();

        let message = &response.choices[0].message;
        assert!(message.has_tool_calls());
        assert_eq!(message.content, None);
        let usage = response.usage.as_ref().unwrap();
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.extra.get("reasoning_tokens"), Some(&json!(3)));
        assert_eq!(response.extra.get("system_fingerprint"), Some(&json!("fp_1")));
    }

    #[test]
    fn test_tool_choice_names() {
        assert_eq!(serde_json::to_value(ToolChoice::default()).unwrap(), json!("auto"));
        let choice: ToolChoice = serde_json::from_value(json!("required")).unwrap();
        assert_eq!(choice, ToolChoice::Required);
        assert!(serde_json::from_value::<ToolChoice>(json!("sometimes")).is_err());
    }
}
