//! Tool handler trait, call arguments and call output.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;

use crate::api::CallContext;
use crate::types::{Error, Result};

/// Async implementation behind a registered tool.
///
/// Closures and `async fn(CallContext, Arguments) -> Result<ToolOutput>` items
/// implement this trait directly.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: CallContext, args: Arguments) -> Result<ToolOutput>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(CallContext, Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolOutput>> + Send,
{
    async fn call(&self, ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
        (self)(ctx, args).await
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// Named arguments of one tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Look at a boolean flag without removing it. Non-boolean values read as unset.
    pub fn peek_flag(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Remove a boolean flag. `null` counts as absent.
    pub fn take_flag(&mut self, key: &str) -> Result<Option<bool>> {
        match self.0.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(Error::validation(format!(
                "{} must be a boolean, got {}",
                key,
                super::schema::value_type_name(&other)
            ))),
        }
    }

    /// Deserialize into a typed argument struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| Error::validation(e.to_string()))
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// =============================================================================
// Output
// =============================================================================

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain JSON, passed through unchanged.
    Raw(Value),
    /// Typed response model, wrapped with its schema on the way out.
    Model(ModelOutput),
}

/// Serialized response model plus schema context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelOutput {
    pub model_name: String,
    pub data: Value,
    pub fields: Value,
    pub description: String,
}

impl ToolOutput {
    pub fn raw(value: Value) -> Self {
        Self::Raw(value)
    }

    pub fn model<T: Serialize + JsonSchema>(model: &T) -> Result<Self> {
        let model_name = T::schema_name();
        let fields = serde_json::to_value(schemars::schema_for!(T))?;
        let data = serde_json::to_value(model)?;
        Ok(Self::Model(ModelOutput {
            description: format!(
                "Response data structured according to the {} model",
                model_name
            ),
            model_name,
            data,
            fields,
        }))
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            Self::Raw(v) => Some(v),
            Self::Model(_) => None,
        }
    }

    /// Wire shape: raw values as-is, models as `{data, schema}`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Raw(v) => v,
            Self::Model(m) => serde_json::json!({
                "data": m.data,
                "schema": {
                    "model_name": m.model_name,
                    "fields": m.fields,
                    "description": m.description,
                },
            }),
        }
    }
}
