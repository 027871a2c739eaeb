//! Process-wide wiring: HTTP client, safety state and the tool registry.
//!
//! Everything here is built once at startup and shared read-only afterwards.
//! The rate limiter is the only mutable piece and guards its own state.

use std::sync::Arc;

use crate::api::{ApiClient, CallContext};
use crate::mcp::{Dispatcher, McpServer};
use crate::registry::ToolRegistry;
use crate::safety::SafetyContext;
use crate::types::{Config, Result};

#[derive(Debug, Clone)]
pub struct Runtime {
    registry: Arc<ToolRegistry>,
    context: CallContext,
    safety: SafetyContext,
}

impl Runtime {
    /// Validate the config, then build the client and registry.
    pub fn bootstrap(config: Config) -> Result<Self> {
        config.validate()?;

        let api = ApiClient::new(&config.api)?;
        let safety = SafetyContext::new(config.safety);
        let registry = ToolRegistry::build(&safety)?;
        let context = CallContext::new(api, Arc::clone(&safety.config));

        tracing::info!(
            base_url = context.workspace(),
            tools = registry.len(),
            write_enabled = safety.config.write_enabled,
            dry_run_default = safety.config.dry_run_default,
            allow_production = safety.config.allow_production,
            "Runtime ready"
        );
        if safety.config.write_enabled && safety.config.allow_production {
            tracing::warn!("Production writes are allowed; workspace allow-list is bypassed");
        }

        Ok(Self {
            registry: Arc::new(registry),
            context,
            safety,
        })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn safety(&self) -> &SafetyContext {
        &self.safety
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.registry), self.context.clone())
    }

    pub fn server(&self) -> McpServer {
        McpServer::new(self.dispatcher())
    }
}
