//! Core types for the write server.
//!
//! This module provides foundational types used throughout the system:
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the API client, safety gates and logging

mod config;
mod errors;

pub use config::{
    ApiConfig, Config, ObservabilityConfig, SafetyConfig, DEFAULT_ALLOWED_WORKSPACES,
};
pub use errors::{Error, Result};
