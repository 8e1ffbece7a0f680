//! # grok_mcp
//!
//! `grok_mcp` is a Model Context Protocol (MCP) server that exposes xAI's Grok
//! models as three tools: `chat_completion`, `image_understanding` and
//! `function_calling`. Each tool call becomes one request to the xAI chat
//! completions API, and the answer comes back as an MCP tool result.
//!
//! ## Main Components
//!
//! - `transport`: stdio and in-memory transports for JSON-RPC messages
//! - `protocol`: JSON-RPC request routing and response correlation
//! - `server`: MCP server, tool registry and server errors
//! - `client`: MCP client, mostly for in-process use and tests
//! - `xai`: xAI chat completions client and wire types
//! - `tools`: the Grok tools and their argument handling
//! - `config`: credential and base address
//! - `types`: MCP message types
//!
//! ## Example
//!
//! ```rust,no_run
//! use grok_mcp::config::XaiConfig;
//! use grok_mcp::transport::ServerStdioTransport;
//! use grok_mcp::xai::XaiClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = XaiClient::new(XaiConfig::from_env()?)?;
//! grok_mcp::tools::server(&client)
//!     .serve(ServerStdioTransport::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Client implementation for interacting with MCP servers
pub mod client;

/// Credential and base address of the xAI API
pub mod config;

/// JSON-RPC request routing
pub mod protocol;

/// Server implementation for handling MCP requests and responses
pub mod server;

/// Grok tools exposed over MCP
pub mod tools;

/// Transport layer implementations
pub mod transport;

/// Common types and structures used throughout the crate
pub mod types;

/// xAI chat completions client
pub mod xai;

pub use client::Client;
pub use server::McpServer;
