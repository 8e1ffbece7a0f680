//! Upstream configuration
//!
//! The xAI credential and base address are read once at startup and then
//! shared read-only by every tool invocation.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Environment variable holding the xAI API key
pub const API_KEY_ENV: &str = "XAI_API_KEY";
/// Environment variable overriding the xAI base address
pub const BASE_URL_ENV: &str = "XAI_BASE_URL";
/// Base address of the xAI REST API
pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";

/// Errors raised while building an [`XaiConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API key is absent or empty
    #[error("XAI_API_KEY environment variable is required")]
    MissingApiKey,
    /// The base address does not parse as a URL
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        /// The rejected value
        url: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },
    /// The base address is a URL but not an HTTP(S) one
    #[error("base URL '{0}' must use http or https")]
    UnsupportedScheme(String),
}

/// Credential and base address for the xAI API
#[derive(Clone)]
pub struct XaiConfig {
    api_key: String,
    base_url: String,
}

impl XaiConfig {
    /// Configuration for the public xAI endpoint
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] for an empty or blank key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host, such as a local mock server
    ///
    /// A trailing slash is dropped so paths can be appended directly.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.to_string()));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Read `XAI_API_KEY` and the optional `XAI_BASE_URL` from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self::new(lookup(API_KEY_ENV).unwrap_or_default())?;
        match lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            Some(url) => config.with_base_url(url.trim()),
            None => Ok(config),
        }
    }

    /// The bearer credential
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The base address, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the chat completions endpoint
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl fmt::Debug for XaiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XaiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
