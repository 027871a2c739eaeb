//! Tool registry: discovery, metadata extraction and guarded invocation.
//!
//! The registry is built once at startup and shared read-only. Each entry pairs
//! the tool's extracted [`ToolMetadata`] with its composed safety [`Pipeline`].

pub mod declaration;
pub mod discovery;
pub mod docstring;
pub mod handler;
pub mod metadata;
pub mod schema;

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};

pub use declaration::{ParamSpec, ToolDeclaration};
pub use discovery::{Discovery, ToolModule, PLUGIN_NAMESPACE};
pub use handler::{Arguments, ModelOutput, ToolHandler, ToolOutput};
pub use metadata::{ParameterInfo, ReturnInfo, ToolMetadata};
pub use schema::{JsonType, ParamType};

use crate::api::CallContext;
use crate::safety::{Pipeline, SafetyContext};
use crate::types::{Error, Result};

/// One registered tool.
#[derive(Debug)]
pub struct RegisteredTool {
    metadata: ToolMetadata,
    pipeline: Pipeline,
}

impl RegisteredTool {
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }
}

/// Name-keyed tool registry, iterated in name order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from every tool module linked into the binary.
    pub fn build(safety: &SafetyContext) -> Result<Self> {
        let discovery = Discovery::plugin();
        Self::build_from(discovery.discover(), &discovery, safety)
    }

    /// Build from explicit declarations, keeping only those `discovery` qualifies.
    pub fn build_from(
        declarations: Vec<ToolDeclaration>,
        discovery: &Discovery,
        safety: &SafetyContext,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for decl in declarations {
            if !discovery.qualifies(&decl) {
                tracing::debug!(tool = decl.name(), module = decl.module(), "Skipping non-qualifying member");
                continue;
            }
            registry.register(decl, safety)?;
        }
        tracing::info!(count = registry.len(), "Tool registry built");
        Ok(registry)
    }

    /// Register one tool. Names must be unique.
    pub fn register(&mut self, decl: ToolDeclaration, safety: &SafetyContext) -> Result<()> {
        if decl.name().is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if self.tools.contains_key(decl.name()) {
            return Err(Error::DuplicateTool(decl.name().to_string()));
        }

        let metadata = metadata::extract(&decl);
        for param in metadata.parameters.iter().filter(|p| !p.documented) {
            tracing::warn!(tool = decl.name(), parameter = %param.name, "Parameter has no documentation");
        }

        let pipeline = Pipeline::compose(decl.name(), decl.safety_policy(), safety, decl.handler());
        tracing::debug!(tool = decl.name(), guards = ?pipeline.guard_names(), "Registered tool");

        self.tools
            .insert(decl.name().to_string(), RegisteredTool { metadata, pipeline });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `{available_functions: {name: {description, parameters, returns}}, total_functions}`.
    pub fn list_functions(&self) -> Value {
        let available: Map<String, Value> = self
            .tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.metadata.describe()))
            .collect();
        json!({
            "total_functions": available.len(),
            "available_functions": available,
        })
    }

    /// Check arguments against the declared parameters.
    ///
    /// Returns a list of validation errors (empty = valid).
    pub fn validate_params(&self, name: &str, params: &Map<String, Value>) -> Result<Vec<String>> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;
        let parameters = &tool.metadata.parameters;

        let mut errors = Vec::new();

        for info in parameters {
            if info.required && !params.contains_key(&info.name) {
                errors.push(format!("Missing required parameter: {}", info.name));
            }
        }

        let known: HashMap<&str, &ParameterInfo> =
            parameters.iter().map(|p| (p.name.as_str(), p)).collect();

        for (key, value) in params {
            match known.get(key.as_str()) {
                Some(info) if value.is_null() && info.nullable => {}
                Some(info) => {
                    if let Err(e) = info.param_type.validate(value) {
                        errors.push(format!("Parameter '{}': {}", key, e));
                    }
                }
                None => errors.push(format!("Unknown parameter: {}", key)),
            }
        }

        Ok(errors)
    }

    /// Run a tool through its pipeline.
    pub async fn invoke(&self, name: &str, ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;
        tool.pipeline.invoke(ctx, args).await
    }
}

// =============================================================================
// Tests
// =============================================================================
