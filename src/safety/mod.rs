//! Safety pipeline for mutating tools.
//!
//! A [`Pipeline`] wraps one tool handler in an ordered chain of [`Guard`]s.
//! Each guard sees the call, and either short-circuits with its own output or
//! error, or hands the call to [`Next`]. The chain is composed once, at
//! registration, from the tool's declarative [`SafetyPolicy`]:
//!
//! ```text
//! write-enabled -> workspace -> confirmation -> rate limit -> dry run -> handler
//! ```

pub mod guards;
pub mod rate_limiter;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::CallContext;
use crate::registry::{Arguments, ToolHandler, ToolOutput};
use crate::types::{Result, SafetyConfig};

pub use guards::{ConfirmationGuard, DryRunGuard, RateLimitGuard, WorkspaceGuard, WriteEnabledGuard};
pub use rate_limiter::{RateDecision, RateLimiter};

// =============================================================================
// Policy
// =============================================================================

/// Rate limit applied to one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitRule {
    /// `max_sends_per_hour` per hour.
    Sends,
    /// `max_catalog_updates_per_min` per minute.
    CatalogUpdates,
    Fixed { limit: u32, window_secs: u64 },
}

impl RateLimitRule {
    /// Concrete limit and window under `config`. A zero limit or window
    /// means unlimited and yields `None`.
    pub fn resolve(self, config: &SafetyConfig) -> Option<(u32, Duration)> {
        let (limit, window) = match self {
            RateLimitRule::Sends => (config.max_sends_per_hour, Duration::from_secs(3600)),
            RateLimitRule::CatalogUpdates => {
                (config.max_catalog_updates_per_min, Duration::from_secs(60))
            }
            RateLimitRule::Fixed { limit, window_secs } => {
                (limit, Duration::from_secs(window_secs))
            }
        };
        (limit > 0 && !window.is_zero()).then_some((limit, window))
    }
}

/// Which guards a tool runs behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyPolicy {
    pub write_gate: bool,
    pub workspace_gate: bool,
    pub confirm: bool,
    pub rate_limit: Option<RateLimitRule>,
    pub dry_run: bool,
}

impl SafetyPolicy {
    /// No guards.
    pub fn read_only() -> Self {
        Self::default()
    }

    /// Write switch, workspace allow-list and dry-run support.
    pub fn mutating() -> Self {
        Self {
            write_gate: true,
            workspace_gate: true,
            dry_run: true,
            ..Self::default()
        }
    }

    /// Also require `confirm=true`.
    pub fn confirmed(mut self) -> Self {
        self.confirm = true;
        self
    }

    pub fn rate_limited(mut self, rule: RateLimitRule) -> Self {
        self.rate_limit = Some(rule);
        self
    }

    pub fn is_mutating(&self) -> bool {
        self.write_gate
            || self.workspace_gate
            || self.confirm
            || self.dry_run
            || self.rate_limit.is_some()
    }
}

/// Shared state guards are built from.
#[derive(Debug, Clone)]
pub struct SafetyContext {
    pub config: Arc<SafetyConfig>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SafetyContext {
    pub fn new(config: SafetyConfig) -> Self {
        Self::with_limiter(Arc::new(config), Arc::new(RateLimiter::new()))
    }

    pub fn with_limiter(config: Arc<SafetyConfig>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            config,
            rate_limiter,
        }
    }
}

// =============================================================================
// Middleware chain
// =============================================================================

/// One call travelling through the chain.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub operation: String,
    pub context: CallContext,
    pub arguments: Arguments,
}

/// A single safety check.
#[async_trait]
pub trait Guard: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    async fn intercept(&self, call: Invocation, next: Next<'_>) -> Result<ToolOutput>;
}

/// The rest of the chain after the current guard.
pub struct Next<'a> {
    guards: &'a [Box<dyn Guard>],
    handler: &'a dyn ToolHandler,
}

impl<'a> Next<'a> {
    pub fn run(self, call: Invocation) -> BoxFuture<'a, Result<ToolOutput>> {
        match self.guards.split_first() {
            Some((guard, rest)) => {
                let next = Next {
                    guards: rest,
                    handler: self.handler,
                };
                Box::pin(async move { guard.intercept(call, next).await })
            }
            None => {
                let handler = self.handler;
                Box::pin(async move { handler.call(call.context, call.arguments).await })
            }
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.guards.len())
            .finish_non_exhaustive()
    }
}

/// A handler wrapped in its composed guards.
pub struct Pipeline {
    operation: String,
    guards: Vec<Box<dyn Guard>>,
    handler: Arc<dyn ToolHandler>,
    audited: bool,
}

impl Pipeline {
    pub fn compose(
        operation: &str,
        policy: &SafetyPolicy,
        safety: &SafetyContext,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        let config = &safety.config;
        let mut guards: Vec<Box<dyn Guard>> = Vec::new();

        if policy.write_gate {
            guards.push(Box::new(WriteEnabledGuard::new(config.write_enabled)));
        }
        if policy.workspace_gate {
            guards.push(Box::new(WorkspaceGuard::new(Arc::clone(config))));
        }
        if policy.confirm {
            guards.push(Box::new(ConfirmationGuard::new(policy.dry_run)));
        }
        if let Some(rule) = policy.rate_limit {
            match rule.resolve(config) {
                Some((limit, window)) => guards.push(Box::new(RateLimitGuard::new(
                    Arc::clone(&safety.rate_limiter),
                    limit,
                    window,
                ))),
                None => tracing::debug!(operation, "Rate limit disabled"),
            }
        }
        if policy.dry_run {
            guards.push(Box::new(DryRunGuard::new(config.dry_run_default)));
        }

        Self {
            operation: operation.to_string(),
            guards,
            handler,
            audited: policy.is_mutating(),
        }
    }

    pub fn guard_names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    /// Run the call through every guard and, if all pass, the handler.
    pub async fn invoke(&self, context: CallContext, arguments: Arguments) -> Result<ToolOutput> {
        let call_id = Uuid::new_v4();
        let span = tracing::info_span!("tool_call", operation = %self.operation, %call_id);

        async move {
            let audit_params = self.audited.then(|| arguments.clone());
            let call = Invocation {
                operation: self.operation.clone(),
                context,
                arguments,
            };
            let next = Next {
                guards: &self.guards,
                handler: self.handler.as_ref(),
            };
            let result = next.run(call).await;

            if let Some(params) = audit_params {
                log_write_operation(&self.operation, &params, &result);
            }
            result
        }
        .instrument(span)
        .await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("operation", &self.operation)
            .field("guards", &self.guard_names())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Audit
// =============================================================================

/// Emit the audit record for one mutating call.
pub fn log_write_operation(operation: &str, parameters: &Arguments, result: &Result<ToolOutput>) {
    let parameters = serde_json::to_string(parameters).unwrap_or_default();
    match result {
        Ok(output) => tracing::info!(
            target: "audit",
            operation,
            parameters = %parameters,
            result = outcome(output),
            "Write operation completed"
        ),
        Err(err) => tracing::error!(
            target: "audit",
            operation,
            parameters = %parameters,
            result = "error",
            error = %err,
            "Write operation failed"
        ),
    }
}

fn outcome(output: &ToolOutput) -> &'static str {
    match output.as_raw() {
        Some(v) if v.get("dry_run") == Some(&Value::Bool(true)) => "dry_run",
        Some(v) if v.get("error").is_some() => "rejected",
        _ => "success",
    }
}
