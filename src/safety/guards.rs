//! The individual safety guards.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::rate_limiter::RateLimiter;
use super::{Guard, Invocation, Next};
use crate::registry::ToolOutput;
use crate::types::{Error, Result, SafetyConfig};

/// Rejects every call while writes are globally disabled.
#[derive(Debug)]
pub struct WriteEnabledGuard {
    enabled: bool,
}

impl WriteEnabledGuard {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl Guard for WriteEnabledGuard {
    fn name(&self) -> &'static str {
        "write_enabled"
    }

    async fn intercept(&self, call: Invocation, next: Next<'_>) -> Result<ToolOutput> {
        if !self.enabled {
            tracing::warn!(operation = %call.operation, "Write operation rejected, writes disabled");
            return Err(Error::write_disabled(call.operation));
        }
        next.run(call).await
    }
}

/// Only lets calls through against allow-listed workspaces.
#[derive(Debug)]
pub struct WorkspaceGuard {
    config: Arc<SafetyConfig>,
}

impl WorkspaceGuard {
    pub fn new(config: Arc<SafetyConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Guard for WorkspaceGuard {
    fn name(&self) -> &'static str {
        "workspace"
    }

    async fn intercept(&self, call: Invocation, next: Next<'_>) -> Result<ToolOutput> {
        if !self.config.allow_production {
            let workspace = call.context.workspace();
            if !self.config.is_allowed_workspace(workspace) {
                tracing::warn!(
                    operation = %call.operation,
                    workspace,
                    "Write operation blocked for workspace"
                );
                return Err(Error::WorkspaceBlocked {
                    workspace: workspace.to_string(),
                    operation: call.operation,
                    allowed: self.config.allowed_workspaces.clone(),
                });
            }
            tracing::info!(operation = %call.operation, workspace, "Workspace safety check passed");
        }
        next.run(call).await
    }
}

/// Requires `confirm=true` on destructive calls.
#[derive(Debug)]
pub struct ConfirmationGuard {
    dry_run_satisfies: bool,
}

impl ConfirmationGuard {
    /// With `dry_run_satisfies`, an explicit `dry_run=true` also passes, since
    /// a dry-run guard further down the chain will stop the call.
    pub fn new(dry_run_satisfies: bool) -> Self {
        Self { dry_run_satisfies }
    }
}

#[async_trait]
impl Guard for ConfirmationGuard {
    fn name(&self) -> &'static str {
        "confirmation"
    }

    async fn intercept(&self, mut call: Invocation, next: Next<'_>) -> Result<ToolOutput> {
        let confirmed = call.arguments.take_flag("confirm")?.unwrap_or(false);
        let dry_run = self.dry_run_satisfies && call.arguments.peek_flag("dry_run") == Some(true);

        if confirmed || dry_run {
            if confirmed {
                tracing::warn!(operation = %call.operation, "Confirmed destructive operation");
            }
            return next.run(call).await;
        }

        tracing::warn!(
            operation = %call.operation,
            arguments = ?call.arguments,
            "Destructive operation blocked, confirm=true missing"
        );
        Ok(ToolOutput::raw(json!({
            "error": "Destructive operation requires confirmation",
            "operation": call.operation,
            "message": "Add confirm=true parameter to proceed",
            "parameters": Value::Object(call.arguments.into_map()),
        })))
    }
}

/// Sliding-window limit keyed by operation name.
#[derive(Debug)]
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
    limit: u32,
    window: Duration,
}

impl RateLimitGuard {
    pub fn new(limiter: Arc<RateLimiter>, limit: u32, window: Duration) -> Self {
        Self {
            limiter,
            limit,
            window,
        }
    }
}

#[async_trait]
impl Guard for RateLimitGuard {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn intercept(&self, call: Invocation, next: Next<'_>) -> Result<ToolOutput> {
        let decision = self
            .limiter
            .check_and_record(&call.operation, self.limit, self.window);

        if let Some(err) = decision.to_error() {
            tracing::error!(operation = %call.operation, detail = %decision.detail(), "Rate limit exceeded");
            return Err(err);
        }
        tracing::debug!(operation = %call.operation, detail = %decision.detail(), "Rate limit check passed");
        next.run(call).await
    }
}

/// Simulates the call instead of running it.
#[derive(Debug)]
pub struct DryRunGuard {
    default: bool,
}

impl DryRunGuard {
    /// `default` applies when the caller does not pass `dry_run`.
    pub fn new(default: bool) -> Self {
        Self { default }
    }
}

#[async_trait]
impl Guard for DryRunGuard {
    fn name(&self) -> &'static str {
        "dry_run"
    }

    async fn intercept(&self, mut call: Invocation, next: Next<'_>) -> Result<ToolOutput> {
        let dry_run = call.arguments.take_flag("dry_run")?.unwrap_or(self.default);
        if !dry_run {
            return next.run(call).await;
        }

        tracing::info!(operation = %call.operation, arguments = ?call.arguments, "DRY RUN");
        Ok(ToolOutput::raw(json!({
            "dry_run": true,
            "operation": call.operation,
            "would_execute": {
                "function": call.operation,
                "arguments": Value::Object(call.arguments.into_map()),
            },
            "message": "This is a dry run. No actual API call was made.",
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CallContext;
    use crate::registry::handler::{Arguments, MockToolHandler, ToolHandler};
    use crate::safety::{Pipeline, SafetyContext, SafetyPolicy};
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::from(map),
            _ => Arguments::new(),
        }
    }

    fn counting_handler(times: usize) -> Arc<dyn ToolHandler> {
        let mut mock = MockToolHandler::new();
        mock.expect_call()
            .times(times)
            .returning(|_, _| Ok(ToolOutput::raw(json!({"message": "success"}))));
        Arc::new(mock)
    }

    fn config(write_enabled: bool, allow_production: bool, patterns: &[&str]) -> SafetyConfig {
        SafetyConfig {
            write_enabled,
            allow_production,
            allowed_workspaces: patterns.iter().map(|p| p.to_string()).collect(),
            ..SafetyConfig::default()
        }
    }

    async fn run(
        config: SafetyConfig,
        policy: SafetyPolicy,
        base_url: &str,
        arguments: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Value> {
        let pipeline = Pipeline::compose("op", &policy, &SafetyContext::new(config), handler);
        pipeline
            .invoke(CallContext::for_tests(base_url), args(arguments))
            .await
            .map(ToolOutput::into_value)
    }

    #[tokio::test]
    async fn workspace_allow_list() {
        let demo = "https://rest.demo-01.example.com";
        let prod = "https://rest.iad-01.example.com";

        let ok = run(config(true, false, &["demo-"]), SafetyPolicy::mutating(), demo, json!({}), counting_handler(1)).await;
        assert!(ok.is_ok());

        let blocked = run(config(true, false, &["demo-"]), SafetyPolicy::mutating(), prod, json!({}), counting_handler(0)).await;
        match blocked {
            Err(Error::WorkspaceBlocked { workspace, allowed, .. }) => {
                assert_eq!(workspace, prod);
                assert_eq!(allowed, vec!["demo-"]);
            }
            other => panic!("expected workspace block, got {other:?}"),
        }

        let overridden = run(config(true, true, &["demo-"]), SafetyPolicy::mutating(), prod, json!({}), counting_handler(1)).await;
        assert!(overridden.is_ok());
    }

    #[tokio::test]
    async fn empty_pattern_list_blocks_everything() {
        let blocked = run(
            config(true, false, &[""]),
            SafetyPolicy::mutating(),
            "https://rest.demo-01.example.com",
            json!({}),
            counting_handler(0),
        )
        .await;
        assert!(matches!(blocked, Err(Error::WorkspaceBlocked { .. })));
    }

    #[tokio::test]
    async fn write_gate_runs_before_workspace_gate() {
        let err = run(
            config(false, false, &["demo-"]),
            SafetyPolicy::mutating(),
            "https://rest.iad-01.example.com",
            json!({}),
            counting_handler(0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::WriteDisabled { .. }));
    }

    #[tokio::test]
    async fn dry_run_flag_short_circuits_without_handler() {
        let out = run(
            config(true, false, &["demo-"]),
            SafetyPolicy::mutating(),
            "https://rest.demo-01.example.com",
            json!({"campaign_id": "c1", "dry_run": true}),
            counting_handler(0),
        )
        .await
        .unwrap();

        assert_eq!(
            out,
            json!({
                "dry_run": true,
                "operation": "op",
                "would_execute": {"function": "op", "arguments": {"campaign_id": "c1"}},
                "message": "This is a dry run. No actual API call was made.",
            })
        );
    }

    #[tokio::test]
    async fn explicit_dry_run_false_overrides_default() {
        let mut cfg = config(true, false, &["demo-"]);
        cfg.dry_run_default = true;
        let out = run(
            cfg,
            SafetyPolicy::mutating(),
            "https://rest.demo-01.example.com",
            json!({"dry_run": false}),
            counting_handler(1),
        )
        .await
        .unwrap();
        assert_eq!(out, json!({"message": "success"}));
    }

    #[tokio::test]
    async fn dry_run_satisfies_confirmation() {
        let out = run(
            config(true, false, &["demo-"]),
            SafetyPolicy::mutating().confirmed(),
            "https://rest.demo-01.example.com",
            json!({"user": "u1", "dry_run": true}),
            counting_handler(0),
        )
        .await
        .unwrap();
        assert_eq!(out["dry_run"], json!(true));
    }

    #[tokio::test]
    async fn confirm_false_is_blocked() {
        let out = run(
            config(true, false, &["demo-"]),
            SafetyPolicy::mutating().confirmed(),
            "https://rest.demo-01.example.com",
            json!({"confirm": false}),
            counting_handler(0),
        )
        .await
        .unwrap();
        assert_eq!(out["error"], json!("Destructive operation requires confirmation"));
        assert_eq!(out["parameters"], json!({}));
    }

    #[tokio::test]
    async fn non_boolean_flags_are_validation_errors() {
        let err = run(
            config(true, false, &["demo-"]),
            SafetyPolicy::mutating().confirmed(),
            "https://rest.demo-01.example.com",
            json!({"confirm": "yes"}),
            counting_handler(0),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
