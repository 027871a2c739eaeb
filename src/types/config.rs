//! Configuration structures.
//!
//! Configuration is loaded from environment variables by the binary (see
//! `main.rs`) and handed to the runtime as plain structs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::{Error, Result};

/// Workspace patterns allowed for writes when none are configured.
pub const DEFAULT_ALLOWED_WORKSPACES: &str = "demo-,poc-,test-";

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// REST API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Write safety settings.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::configuration(
                "BRAZE_BASE_URL is required (e.g. https://rest.iad-01.braze.com)",
            ));
        }
        if self.api.api_key.trim().is_empty() {
            return Err(Error::configuration(
                "BRAZE_API_KEY is required. Set it to your REST API key.",
            ));
        }
        Ok(())
    }
}

/// REST API connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the workspace REST endpoint, without trailing slash.
    pub base_url: String,

    /// Bearer token. Never serialized.
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Fixed timeout applied to every outbound request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Write safety configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Master kill switch for every mutating tool.
    pub write_enabled: bool,

    /// Skip the workspace allow-list check.
    pub allow_production: bool,

    /// Dry-run mutating tools unless the caller passes `dry_run=false`.
    pub dry_run_default: bool,

    /// Substrings of the base URL that mark a workspace as safe for writes.
    pub allowed_workspaces: Vec<String>,

    /// Ceiling for send/trigger operations per hour.
    pub max_sends_per_hour: u32,

    /// Ceiling for catalog item updates per minute.
    pub max_catalog_updates_per_min: u32,
}

impl SafetyConfig {
    /// Split a comma-separated pattern list, dropping blank entries.
    pub fn parse_patterns(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether `workspace` matches at least one allowed pattern.
    ///
    /// Blank patterns never match, so an empty list blocks every workspace.
    pub fn is_allowed_workspace(&self, workspace: &str) -> bool {
        self.allowed_workspaces
            .iter()
            .map(|p| p.trim())
            .any(|p| !p.is_empty() && workspace.contains(p))
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            write_enabled: false,
            allow_production: false,
            dry_run_default: false,
            allowed_workspaces: Self::parse_patterns(DEFAULT_ALLOWED_WORKSPACES),
            max_sends_per_hour: 1000,
            max_catalog_updates_per_min: 100,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_fail_closed() {
        let safety = SafetyConfig::default();
        assert!(!safety.write_enabled);
        assert!(!safety.allow_production);
        assert!(!safety.dry_run_default);
        assert_eq!(safety.allowed_workspaces, vec!["demo-", "poc-", "test-"]);
    }

    #[test]
    fn parse_patterns_trims_and_drops_blanks() {
        assert_eq!(
            SafetyConfig::parse_patterns(" demo- , ,sandbox"),
            vec!["demo-", "sandbox"]
        );
        assert!(SafetyConfig::parse_patterns("").is_empty());
    }

    #[test]
    fn workspace_matching_is_substring_based() {
        let safety = SafetyConfig::default();
        assert!(safety.is_allowed_workspace("https://rest.demo-east.example.com"));
        assert!(!safety.is_allowed_workspace("https://rest.prod-east.example.com"));

        let empty = SafetyConfig {
            allowed_workspaces: vec![String::new()],
            ..SafetyConfig::default()
        };
        assert!(!empty.is_allowed_workspace("https://anything"));
    }

    #[test]
    fn api_config_trims_trailing_slash() {
        let api = ApiConfig::new("https://rest.demo-01.example.com/", "key");
        assert_eq!(api.base_url, "https://rest.demo-01.example.com");
        assert_eq!(api.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn validate_requires_base_url_and_key() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.api = ApiConfig::new("https://rest.demo-01.example.com", "");
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.api.api_key = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn api_key_is_redacted_in_debug_and_serde() {
        let api = ApiConfig::new("https://rest.demo-01.example.com", "super-secret");
        assert!(!format!("{api:?}").contains("super-secret"));
        let json = serde_json::to_string(&api).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(json.contains("\"request_timeout\":\"30s\""));
    }
}
