//! Model Context Protocol surface.
//!
//! Clients see two tools, `list_functions` and `call_function`. Every
//! registered write tool is reached through `call_function`, so the
//! registry can grow without the advertised tool list changing.

pub mod codec;
pub mod dispatch;
pub mod errors;
pub mod protocol;
pub mod server;

pub use dispatch::Dispatcher;
pub use server::{tool_definitions, McpServer};
