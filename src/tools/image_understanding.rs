use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{first_choice_text, model_schema, non_empty, GrokTool, ToolError};
use crate::xai::{
    ChatMessage, ContentPart, ImageDetail, ImageUrl, MessageContent, VisionOptions, XaiClient,
    DEFAULT_VISION_MODEL,
};

/// Arguments of `image_understanding`
#[derive(Debug, Deserialize)]
pub struct ImageUnderstandingArgs {
    /// Question or instruction about the image
    #[serde(default)]
    pub prompt: Option<String>,
    /// Image URL; wins over `base64_image` when both are given
    #[serde(default)]
    pub image_url: Option<String>,
    /// Base64-encoded JPEG
    #[serde(default)]
    pub base64_image: Option<String>,
    /// Model id
    #[serde(default)]
    pub model: Option<String>,
    /// Anything else, forwarded to the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ask a Grok vision model about one image
pub struct ImageUnderstanding;

impl ImageUnderstanding {
    /// Check the arguments and build the single user message
    pub fn prepare(args: ImageUnderstandingArgs) -> Result<(Vec<ChatMessage>, VisionOptions), ToolError> {
        let prompt = non_empty(args.prompt).ok_or_else(|| ToolError::validation("prompt is required"))?;

        let url = match (non_empty(args.image_url), non_empty(args.base64_image)) {
            (Some(url), _) => url,
            (None, Some(data)) => format!("data:image/jpeg;base64,{data}"),
            (None, None) => {
                return Err(ToolError::validation(
                    "either image_url or base64_image is required",
                ))
            }
        };

        let message = ChatMessage::user(MessageContent::Parts(vec![
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url,
                    detail: ImageDetail::High,
                },
            },
            ContentPart::Text { text: prompt },
        ]));

        Ok((
            vec![message],
            VisionOptions {
                model: args.model,
                extra: args.extra,
            },
        ))
    }
}

#[async_trait]
impl GrokTool for ImageUnderstanding {
    type Args = ImageUnderstandingArgs;

    const NAME: &'static str = "image_understanding";

    fn description(&self) -> &'static str {
        "Analyze an image with a Grok vision model and answer a prompt about it"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Question or instruction about the image"
                },
                "image_url": {
                    "type": "string",
                    "description": "URL of the image (takes precedence over base64_image)"
                },
                "base64_image": {
                    "type": "string",
                    "description": "Base64-encoded JPEG image, without the data: prefix"
                },
                "model": model_schema(DEFAULT_VISION_MODEL)
            },
            "required": ["prompt"]
        })
    }

    async fn invoke(&self, client: &XaiClient, args: ImageUnderstandingArgs) -> Result<String, ToolError> {
        let (messages, options) = Self::prepare(args)?;
        let response = client.create_image_understanding(&messages, &options).await?;
        first_choice_text(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepare(value: Value) -> Result<(Vec<ChatMessage>, VisionOptions), ToolError> {
        ImageUnderstanding::prepare(serde_json::from_value(value).unwrap())
    }

    fn image_url_of(messages: &[ChatMessage]) -> &str {
        match &messages[0].content {
            Some(MessageContent::Parts(parts)) => match &parts[0] {
                ContentPart::ImageUrl { image_url } => &image_url.url,
                other => panic!("expected image part first, got {other:?}"),
            },
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn test_base64_becomes_data_uri() {
        let (messages, _) = prepare(json!({"prompt": "What is this?", "base64_image": "ABCD"})).unwrap();
        assert_eq!(image_url_of(&messages), "data:image/jpeg;base64,ABCD");
    }

    #[test]
    fn test_image_url_wins_over_base64() {
        let (messages, _) = prepare(json!({
            "prompt": "Describe",
            "image_url": "https://example.com/a.png",
            "base64_image": "ABCD"
        }))
        .unwrap();
        assert_eq!(image_url_of(&messages), "https://example.com/a.png");
    }

    #[test]
    fn test_message_shape() {
        let (messages, options) = prepare(json!({
            "prompt": "Describe",
            "image_url": "https://example.com/a.png",
            "max_tokens": 300
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&messages).unwrap(),
            json!([{
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": "https://example.com/a.png", "detail": "high"}},
                    {"type": "text", "text": "Describe"}
                ]
            }])
        );
        assert_eq!(options.extra.get("max_tokens"), Some(&json!(300)));
    }

    #[test]
    fn test_missing_inputs() {
        let err = prepare(json!({"image_url": "https://example.com/a.png"})).unwrap_err();
        assert_eq!(err.to_string(), "prompt is required");

        let err = prepare(json!({"prompt": "", "image_url": "https://example.com/a.png"})).unwrap_err();
        assert_eq!(err.to_string(), "prompt is required");

        let err = prepare(json!({"prompt": "Describe"})).unwrap_err();
        assert_eq!(err.to_string(), "either image_url or base64_image is required");

        let err = prepare(json!({"prompt": "Describe", "image_url": "", "base64_image": ""})).unwrap_err();
        assert_eq!(err.to_string(), "either image_url or base64_image is required");
    }

    #[test]
    fn test_empty_image_url_falls_back_to_base64() {
        let (messages, _) = prepare(json!({"prompt": "Describe", "image_url": "", "base64_image": "QUJD"})).unwrap();
        assert_eq!(image_url_of(&messages), "data:image/jpeg;base64,QUJD");
    }
}
