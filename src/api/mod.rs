//! REST API plumbing shared by every tool.

mod client;
pub mod models;

use std::sync::Arc;

pub use client::{handle_raw, handle_response, ApiClient, ApiResponse};

use crate::types::SafetyConfig;

/// Per-call context handed to tool handlers.
///
/// Cheap to clone: the HTTP client is pooled and the config is shared.
#[derive(Debug, Clone)]
pub struct CallContext {
    api: ApiClient,
    safety: Arc<SafetyConfig>,
}

impl CallContext {
    pub fn new(api: ApiClient, safety: Arc<SafetyConfig>) -> Self {
        Self { api, safety }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn safety(&self) -> &SafetyConfig {
        &self.safety
    }

    /// Workspace identifier used by the allow-list: the API base URL.
    pub fn workspace(&self) -> &str {
        self.api.base_url()
    }

    #[cfg(test)]
    pub(crate) fn for_tests(base_url: &str) -> Self {
        Self::for_tests_with(base_url, SafetyConfig::default())
    }

    #[cfg(test)]
    pub(crate) fn for_tests_with(base_url: &str, safety: SafetyConfig) -> Self {
        let config = crate::types::ApiConfig::new(base_url, "test-key");
        match ApiClient::new(&config) {
            Ok(api) => Self::new(api, Arc::new(safety)),
            Err(e) => panic!("test client: {e}"),
        }
    }
}
