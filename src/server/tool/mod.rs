//! Tool registration and execution
//!
//! A tool is a named operation with a JSON Schema describing its arguments.
//! [`ToolBuilder`] pairs that metadata with an async callback and produces a
//! [`RegisteredTool`] the server can list and invoke.
//!
//! Every invocation yields a [`CallToolResponse`]: a tool that ran and failed
//! reports an error-flagged result instead of a protocol error. Use
//! [`ToolBuilder::build_fallible`] to get that shaping for free from a
//! callback that returns `Result<String, E>`.
//!
//! # Examples
//!
//! ```
//! use grok_mcp::server::tool::ToolBuilder;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct ShoutArgs {
//!     text: String,
//! }
//!
//! let tool = ToolBuilder::new("shout")
//!     .description("Upper-cases its input")
//!     .input_schema(serde_json::json!({
//!         "type": "object",
//!         "properties": { "text": { "type": "string" } },
//!         "required": ["text"]
//!     }))
//!     .build_fallible(|args: ShoutArgs| async move {
//!         Ok::<_, serde_json::Error>(args.text.to_uppercase())
//!     });
//!
//! assert_eq!(tool.metadata.name, "shout");
//! ```

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{CallToolResponse, Tool};

/// A tool with its metadata and execution callback
#[derive(Clone)]
pub struct RegisteredTool {
    /// The tool metadata advertised by `tools/list`
    pub metadata: Tool,
    /// The callback to execute the tool
    pub execute_callback: Arc<dyn ToolCallback>,
}

impl RegisteredTool {
    /// The tool's name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Run the tool with the caller's arguments
    pub async fn call(&self, args: Option<Map<String, Value>>) -> CallToolResponse {
        self.execute_callback.call(args).await
    }
}

/// A callback that can execute a tool
///
/// Arguments arrive as the JSON object from the `tools/call` request, with
/// key order preserved. `None` means the caller sent no arguments.
pub trait ToolCallback: Send + Sync {
    /// Calls the tool with optional arguments
    fn call(&self, args: Option<Map<String, Value>>) -> ToolFuture;
}

/// Future returned by tool callbacks
pub type ToolFuture = Pin<Box<dyn Future<Output = CallToolResponse> + Send>>;
type ToolCallbackFunc = Box<dyn Fn(Option<Map<String, Value>>) -> ToolFuture + Send + Sync>;

struct ToolCallbackFn(ToolCallbackFunc);

impl ToolCallback for ToolCallbackFn {
    fn call(&self, args: Option<Map<String, Value>>) -> ToolFuture {
        (self.0)(args)
    }
}

/// Builder for [`RegisteredTool`]
pub struct ToolBuilder {
    name: String,
    description: Option<String>,
    input_schema: Option<Value>,
}

impl ToolBuilder {
    /// Create a new tool builder with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    /// Add a description to the tool
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the JSON Schema for the tool's arguments
    ///
    /// Defaults to `{"type": "object"}` when not set.
    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    fn metadata(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self
                .input_schema
                .clone()
                .unwrap_or_else(|| serde_json::json!({ "type": "object" })),
        }
    }

    /// Build the tool with a raw callback
    ///
    /// The callback is responsible for producing the whole
    /// [`CallToolResponse`], including error results.
    pub fn build<F, Fut>(self, callback: F) -> RegisteredTool
    where
        F: Fn(Option<Map<String, Value>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallToolResponse> + Send + 'static,
    {
        RegisteredTool {
            metadata: self.metadata(),
            execute_callback: Arc::new(ToolCallbackFn(Box::new(move |args| {
                Box::pin(callback(args))
            }))),
        }
    }

    /// Build the tool with a typed, fallible callback
    ///
    /// Arguments are deserialized into `T` (missing arguments are treated as
    /// an empty object). `Ok(text)` becomes a successful single-text result;
    /// a deserialization failure or `Err(e)` becomes an error-flagged result
    /// whose text is `"Error: {e}"`.
    pub fn build_fallible<T, E, F, Fut>(self, callback: F) -> RegisteredTool
    where
        T: DeserializeOwned + Send + 'static,
        E: Display + From<serde_json::Error> + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, E>> + Send + 'static,
    {
        let name = self.name.clone();
        let callback = Arc::new(callback);
        self.build(move |args| {
            let callback = Arc::clone(&callback);
            let name = name.clone();
            async move {
                let outcome = match serde_json::from_value::<T>(Value::Object(args.unwrap_or_default())) {
                    Ok(args) => callback(args).await,
                    Err(e) => Err(E::from(e)),
                };
                match outcome {
                    Ok(text) => {
                        debug!("Tool '{}' succeeded", name);
                        CallToolResponse::success(text)
                    }
                    Err(e) => {
                        warn!("Tool '{}' failed: {}", name, e);
                        CallToolResponse::error(format!("Error: {}", e))
                    }
                }
            }
        })
    }
}
