//! # xAI Upstream Client
//!
//! Thin client for the xAI (Grok) chat completions API. Each operation is a
//! single `POST <base_url>/chat/completions` with bearer authentication and a
//! JSON body. There is no retry, no caching and no timeout; a call finishes
//! when the API answers or the connection fails.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use grok_mcp::config::XaiConfig;
//! use grok_mcp::xai::{ChatMessage, ChatOptions, MessageContent, XaiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = XaiClient::new(XaiConfig::from_env()?)?;
//! let messages = vec![ChatMessage::user(MessageContent::Text("Hello, Grok".into()))];
//! let response = client
//!     .create_chat_completion(&messages, &ChatOptions::default())
//!     .await?;
//! println!("{:?}", response.choices[0].message.content);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod types;

pub use client::{
    ChatOptions, FunctionCallOptions, VisionOptions, XaiClient, DEFAULT_CHAT_MODEL,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_VISION_MODEL,
};
pub use error::UpstreamError;
pub use types::*;
