//! Tool declarations: the contract a tool module hands to the registry.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::handler::ToolHandler;
use super::schema::{serialize_default, JsonType, ParamType};
use crate::safety::SafetyPolicy;

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    name: String,
    param_type: Option<ParamType>,
    nullable: bool,
    default: Option<Value>,
}

impl ParamSpec {
    /// Parameter without a default.
    pub fn required<T: JsonType + ?Sized>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: Some(T::TYPE),
            nullable: T::NULLABLE,
            default: None,
        }
    }

    /// Parameter with a default, rendered through [`serialize_default`].
    pub fn optional<T: JsonType + Serialize + fmt::Debug>(
        name: impl Into<String>,
        default: T,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: Some(T::TYPE),
            nullable: T::NULLABLE,
            default: Some(serialize_default(&default)),
        }
    }

    /// Parameter declared without type information. Listed as `string`.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: None,
            nullable: false,
            default: None,
        }
    }

    /// Attach an already rendered default (placeholders included).
    pub fn with_default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type.unwrap_or(ParamType::String)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A named async handler plus everything needed to describe and guard it.
#[derive(Clone)]
pub struct ToolDeclaration {
    name: String,
    module: &'static str,
    doc: Option<&'static str>,
    params: Vec<ParamSpec>,
    returns: ParamType,
    policy: SafetyPolicy,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDeclaration {
    /// `module` should be `module_path!()` of the declaring module.
    pub fn new<H>(name: impl Into<String>, module: &'static str, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        Self {
            name: name.into(),
            module,
            doc: None,
            params: Vec::new(),
            returns: ParamType::Object,
            policy: SafetyPolicy::read_only(),
            handler: Arc::new(handler),
        }
    }

    pub fn doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, return_type: ParamType) -> Self {
        self.returns = return_type;
        self
    }

    pub fn policy(mut self, policy: SafetyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn documentation(&self) -> Option<&'static str> {
        self.doc
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn return_type(&self) -> ParamType {
        self.returns
    }

    pub fn safety_policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for ToolDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDeclaration")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
