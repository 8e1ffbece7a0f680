use serde_json::{Map, Value};
use tracing::debug;

use super::error::UpstreamError;
use super::types::{ChatCompletionResponse, ChatMessage, ToolChoice};
use crate::config::XaiConfig;

type Result<T> = std::result::Result<T, UpstreamError>;

/// Model used by chat completion and function calling when none is given
pub const DEFAULT_CHAT_MODEL: &str = "grok-3-mini-beta";
/// Model used by image understanding when none is given
pub const DEFAULT_VISION_MODEL: &str = "grok-2-vision-latest";
/// Sampling temperature used when none is given
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
/// Completion token limit used when none is given
pub const DEFAULT_MAX_TOKENS: u32 = 16384;

/// Options for a plain chat completion
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Model id, [`DEFAULT_CHAT_MODEL`] when absent
    pub model: Option<String>,
    /// Sampling temperature, [`DEFAULT_TEMPERATURE`] when absent
    pub temperature: Option<f64>,
    /// Completion token limit, [`DEFAULT_MAX_TOKENS`] when absent
    pub max_tokens: Option<u32>,
    /// Additional request fields, forwarded as given
    pub extra: Map<String, Value>,
}

/// Options for an image understanding request
#[derive(Debug, Clone, Default)]
pub struct VisionOptions {
    /// Model id, [`DEFAULT_VISION_MODEL`] when absent
    pub model: Option<String>,
    /// Additional request fields, forwarded as given
    pub extra: Map<String, Value>,
}

/// Options for a function calling request
#[derive(Debug, Clone, Default)]
pub struct FunctionCallOptions {
    /// Model id, [`DEFAULT_CHAT_MODEL`] when absent
    pub model: Option<String>,
    /// Tool usage policy, `auto` when absent
    pub tool_choice: Option<ToolChoice>,
    /// Additional request fields, forwarded as given
    pub extra: Map<String, Value>,
}

/// Client for the xAI chat completions endpoint
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct XaiClient {
    http: reqwest::Client,
    config: XaiConfig,
    endpoint: String,
}

impl XaiClient {
    /// Create a client for the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(config: XaiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let endpoint = config.chat_completions_url();
        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &XaiConfig {
        &self.config
    }

    /// Send a chat completion request
    pub async fn create_chat_completion(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatCompletionResponse> {
        self.post(chat_body(messages, options)?).await
    }

    /// Send a chat completion request whose messages carry image parts
    pub async fn create_image_understanding(
        &self,
        messages: &[ChatMessage],
        options: &VisionOptions,
    ) -> Result<ChatCompletionResponse> {
        self.post(vision_body(messages, options)?).await
    }

    /// Send a chat completion request offering the model a set of tools
    ///
    /// `tools` are OpenAI-style function definitions and are forwarded
    /// verbatim.
    pub async fn create_function_call(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
        options: &FunctionCallOptions,
    ) -> Result<ChatCompletionResponse> {
        self.post(function_call_body(messages, tools, options)?).await
    }

    async fn post(&self, body: Map<String, Value>) -> Result<ChatCompletionResponse> {
        debug!(
            "POST {} (model {})",
            self.endpoint,
            body.get("model").and_then(|m| m.as_str()).unwrap_or_default()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.config.api_key())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            debug!("xAI answered {} ({} bytes)", status, bytes.len());
            return Err(UpstreamError::from_response(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(UpstreamError::Decode)
    }
}

fn messages_value(messages: &[ChatMessage]) -> Result<Value> {
    serde_json::to_value(messages).map_err(UpstreamError::Encode)
}

/// Append caller-supplied fields without touching keys already set
fn merge_extra(body: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        if !body.contains_key(key) {
            body.insert(key.clone(), value.clone());
        }
    }
}

pub(crate) fn chat_body(messages: &[ChatMessage], options: &ChatOptions) -> Result<Map<String, Value>> {
    let mut body = Map::new();
    body.insert("messages".to_string(), messages_value(messages)?);
    body.insert(
        "model".to_string(),
        Value::from(options.model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)),
    );
    body.insert(
        "temperature".to_string(),
        Value::from(options.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
    );
    body.insert(
        "max_tokens".to_string(),
        Value::from(options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    );
    merge_extra(&mut body, &options.extra);
    Ok(body)
}

pub(crate) fn vision_body(messages: &[ChatMessage], options: &VisionOptions) -> Result<Map<String, Value>> {
    let mut body = Map::new();
    body.insert("messages".to_string(), messages_value(messages)?);
    body.insert(
        "model".to_string(),
        Value::from(options.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL)),
    );
    merge_extra(&mut body, &options.extra);
    Ok(body)
}

pub(crate) fn function_call_body(
    messages: &[ChatMessage],
    tools: &[Value],
    options: &FunctionCallOptions,
) -> Result<Map<String, Value>> {
    let mut body = Map::new();
    body.insert("messages".to_string(), messages_value(messages)?);
    body.insert(
        "model".to_string(),
        Value::from(options.model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)),
    );
    body.insert("tools".to_string(), Value::Array(tools.to_vec()));
    body.insert(
        "tool_choice".to_string(),
        serde_json::to_value(options.tool_choice.unwrap_or_default()).map_err(UpstreamError::Encode)?,
    );
    merge_extra(&mut body, &options.extra);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xai::types::MessageContent;
    use serde_json::json;

    fn hello() -> Vec<ChatMessage> {
        vec![ChatMessage::user(MessageContent::Text("hello".to_string()))]
    }

    fn keys(body: &Map<String, Value>) -> Vec<&str> {
        body.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_chat_body_defaults() {
        let body = chat_body(&hello(), &ChatOptions::default()).unwrap();
        assert_eq!(keys(&body), vec!["messages", "model", "temperature", "max_tokens"]);
        assert_eq!(
            Value::Object(body),
            json!({
                "messages": [{"role": "user", "content": "hello"}],
                "model": "grok-3-mini-beta",
                "temperature": 1.0,
                "max_tokens": 16384
            })
        );
    }

    #[test]
    fn test_extra_fields_are_appended_but_never_override() {
        let mut extra = Map::new();
        extra.insert("top_p".to_string(), json!(0.9));
        extra.insert("model".to_string(), json!("ignored"));
        extra.insert("seed".to_string(), json!(7));
        let options = ChatOptions {
            model: Some("grok-3".to_string()),
            temperature: Some(0.2),
            max_tokens: Some(64),
            extra,
        };

        let body = chat_body(&hello(), &options).unwrap();
        assert_eq!(
            keys(&body),
            vec!["messages", "model", "temperature", "max_tokens", "top_p", "seed"]
        );
        assert_eq!(body["model"], "grok-3");
        assert_eq!(body["temperature"], json!(0.2));
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn test_vision_body_default_model() {
        let body = vision_body(&hello(), &VisionOptions::default()).unwrap();
        assert_eq!(keys(&body), vec!["messages", "model"]);
        assert_eq!(body["model"], DEFAULT_VISION_MODEL);
    }

    #[test]
    fn test_function_call_body() {
        let tools = vec![json!({
            "type": "function",
            "function": {"name": "get_weather", "parameters": {"type": "object"}}
        })];
        let body = function_call_body(&hello(), &tools, &FunctionCallOptions::default()).unwrap();
        assert_eq!(keys(&body), vec!["messages", "model", "tools", "tool_choice"]);
        assert_eq!(body["model"], DEFAULT_CHAT_MODEL);
        assert_eq!(body["tools"], Value::Array(tools));
        assert_eq!(body["tool_choice"], "auto");

        let options = FunctionCallOptions {
            tool_choice: Some(ToolChoice::None),
            ..Default::default()
        };
        let body = function_call_body(&hello(), &[], &options).unwrap();
        assert_eq!(body["tool_choice"], "none");
    }
}
