use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failure of a call to the xAI API
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The API answered with a non-2xx status
    #[error("xAI API error ({status}): {message}")]
    Status {
        /// HTTP status of the response
        status: StatusCode,
        /// Error message reported by the API, or the raw body
        message: String,
    },
    /// The request could not be sent or the response could not be read
    #[error("request to xAI failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The request body could not be encoded
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    /// A 2xx response whose body is not a chat completion
    #[error("invalid response from xAI: {0}")]
    Decode(#[source] serde_json::Error),
}

impl UpstreamError {
    /// Build a [`UpstreamError::Status`] from a failed response body
    ///
    /// Prefers the `error.message` (or string `error`) field of a JSON error
    /// document and falls back to the trimmed raw body, then to the status
    /// reason phrase when the body is empty.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|doc| error_message(&doc))
            .unwrap_or_else(|| {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    status.canonical_reason().unwrap_or("no response body").to_string()
                } else {
                    trimmed.to_string()
                }
            });
        Self::Status { status, message }
    }

    /// HTTP status, when the API answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}

fn error_message(doc: &Value) -> Option<String> {
    match doc.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        None => doc.get("message").and_then(Value::as_str).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_openai_style_error() {
        let err = UpstreamError::from_response(
            StatusCode::UNAUTHORIZED,
            br#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        );
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(
            err.to_string(),
            "xAI API error (401 Unauthorized): Incorrect API key provided"
        );
    }

    #[test]
    fn test_message_from_string_error_and_raw_body() {
        let err = UpstreamError::from_response(StatusCode::BAD_REQUEST, br#"{"code":"x","error":"Model not found"}"#);
        assert!(err.to_string().ends_with(": Model not found"));

        let err = UpstreamError::from_response(StatusCode::BAD_GATEWAY, b"upstream timed out\n");
        assert!(err.to_string().ends_with(": upstream timed out"));

        let err = UpstreamError::from_response(StatusCode::SERVICE_UNAVAILABLE, b"");
        assert!(err.to_string().ends_with(": Service Unavailable"));
    }
}
