//! # braze-mcp-write - guarded write tools over MCP
//!
//! Exposes Braze REST write operations (campaign sends, Canvas triggers,
//! catalog and content block changes, user tracking) as tools an MCP client
//! can discover and call.
//!
//! - Tool modules register themselves at link time and are collected into a
//!   [`registry::ToolRegistry`] with metadata parsed from their documentation
//! - Every mutating tool runs inside a [`safety::Pipeline`] of guards: write
//!   switch, workspace allow-list, confirmation, rate limit, dry run
//! - The [`mcp`] layer serves `list_functions` and `call_function` over stdio
//!
//! ## Architecture
//!
//! ```text
//!   stdin  →  McpServer  →  Dispatcher  →  ToolRegistry
//!                                              │
//!                                   Pipeline (guards → handler)
//!                                              │
//!   stdout ←  writer task                  ApiClient → REST API
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod mcp;
pub mod registry;
pub mod runtime;
pub mod safety;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use runtime::Runtime;
pub use types::{Config, Error, Result};
