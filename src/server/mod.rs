//! # MCP Server Implementation
//!
//! Server side of the Model Context Protocol, limited to what this crate
//! exposes: session initialization, `ping`, and tools.
//!
//! ## Submodules
//!
//! * **error**: JSON-RPC error codes and the server error type
//! * **tool**: tool registration, typed callbacks and result shaping
//!
//! The [`McpServer`] type ties them together and binds the request handlers
//! to a transport.

mod mcp;
/// Module for error types and error handling
pub mod error;
/// Module for registering and running tools
pub mod tool;

pub use mcp::McpServer;
