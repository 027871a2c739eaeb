//! Metadata extraction from tool declarations.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::declaration::ToolDeclaration;
use super::docstring::{Docstring, NO_DESCRIPTION};
use super::schema::ParamType;
use crate::types::{Error, Result};

/// Listing entry for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip)]
    pub nullable: bool,
    /// Whether the description came from the documentation.
    #[serde(skip)]
    pub documented: bool,
}

/// Returns-section entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnInfo {
    pub description: String,
    #[serde(rename = "type")]
    pub return_type: ParamType,
}

/// Extracted contract of one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterInfo>,
    pub returns: Option<ReturnInfo>,
    pub error: Option<String>,
}

impl ToolMetadata {
    /// Record used when extraction fails.
    pub fn fallback(name: &str, error: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Function {} (metadata extraction failed)", name),
            parameters: Vec::new(),
            returns: None,
            error: Some(error.into()),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Parameters as an ordered `name -> info` map.
    pub fn parameters_map(&self) -> Map<String, Value> {
        self.parameters
            .iter()
            .map(|p| {
                let info = serde_json::to_value(p).unwrap_or(Value::Null);
                (p.name.clone(), info)
            })
            .collect()
    }

    /// Listing shape: `{description, parameters, returns}` plus `error` on fallbacks.
    pub fn describe(&self) -> Value {
        let mut out = Map::new();
        out.insert("description".into(), Value::String(self.description.clone()));
        out.insert("parameters".into(), Value::Object(self.parameters_map()));
        let returns = self
            .returns
            .as_ref()
            .and_then(|r| serde_json::to_value(r).ok())
            .unwrap_or_else(|| Value::Object(Map::new()));
        out.insert("returns".into(), returns);
        if let Some(error) = &self.error {
            out.insert("error".into(), Value::String(error.clone()));
        }
        Value::Object(out)
    }
}

/// Extract metadata, falling back to a placeholder record on failure.
pub fn extract(decl: &ToolDeclaration) -> ToolMetadata {
    match try_extract(decl) {
        Ok(metadata) => metadata,
        Err(err) => {
            tracing::error!(
                tool = decl.name(),
                module = decl.module(),
                error = %err,
                "Failed to extract metadata"
            );
            ToolMetadata::fallback(decl.name(), err.to_string())
        }
    }
}

pub fn try_extract(decl: &ToolDeclaration) -> Result<ToolMetadata> {
    let doc = decl.documentation().map(Docstring::parse);
    let description = doc
        .as_ref()
        .map_or_else(|| NO_DESCRIPTION.to_string(), Docstring::summary);

    let mut seen = HashSet::new();
    let mut parameters = Vec::with_capacity(decl.params().len());

    for spec in decl.params() {
        let name = spec.name();
        if name.trim().is_empty() {
            return Err(Error::validation(format!(
                "tool {} declares a parameter with an empty name",
                decl.name()
            )));
        }
        if !seen.insert(name) {
            return Err(Error::validation(format!(
                "tool {} declares parameter `{}` twice",
                decl.name(),
                name
            )));
        }

        let documented = doc.as_ref().and_then(|d| d.param(name));
        parameters.push(ParameterInfo {
            name: name.to_string(),
            param_type: spec.param_type(),
            required: spec.is_required(),
            documented: documented.is_some(),
            description: documented.unwrap_or_else(|| format!("Parameter {}", name)),
            default: spec.default().cloned(),
            nullable: spec.is_nullable(),
        });
    }

    let returns = doc.as_ref().and_then(Docstring::returns).map(|description| ReturnInfo {
        description,
        return_type: decl.return_type(),
    });

    Ok(ToolMetadata {
        name: decl.name().to_string(),
        description,
        parameters,
        returns,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CallContext;
    use crate::registry::declaration::ParamSpec;
    use crate::registry::handler::{Arguments, ToolOutput};
    use crate::registry::schema::opaque_default;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    async fn noop(_ctx: CallContext, _args: Arguments) -> Result<ToolOutput> {
        Ok(ToolOutput::raw(json!({})))
    }

    const DOC: &str = "\
Send a campaign.

Args:
    campaign_id: The campaign identifier
    send_id: Optional send identifier

Returns:
    Dictionary with send confirmation
";

    #[test]
    fn documented_tool() {
        let decl = ToolDeclaration::new("send_campaign", module_path!(), noop)
            .doc(DOC)
            .param(ParamSpec::required::<String>("campaign_id"))
            .param(ParamSpec::optional("send_id", None::<String>));

        let meta = extract(&decl);
        assert_eq!(meta.description, "Send a campaign.");
        assert_eq!(
            meta.describe(),
            json!({
                "description": "Send a campaign.",
                "parameters": {
                    "campaign_id": {
                        "type": "string",
                        "required": true,
                        "description": "The campaign identifier",
                    },
                    "send_id": {
                        "type": "string",
                        "required": false,
                        "description": "Optional send identifier",
                        "default": null,
                    },
                },
                "returns": {"description": "Dictionary with send confirmation", "type": "object"},
            })
        );
        assert!(meta.parameter("send_id").unwrap().nullable);
        assert!(meta.parameter("campaign_id").unwrap().documented);
    }

    #[test]
    fn undocumented_tool() {
        let decl = ToolDeclaration::new("ping", module_path!(), noop)
            .param(ParamSpec::untyped("x"))
            .param(ParamSpec::optional("limit", 10));

        let meta = extract(&decl);
        assert_eq!(meta.description, NO_DESCRIPTION);
        assert!(meta.returns.is_none());

        let x = meta.parameter("x").unwrap();
        assert_eq!(x.param_type, ParamType::String);
        assert_eq!(x.description, "Parameter x");
        assert!(x.required);
        assert!(!x.documented);

        let limit = meta.parameter("limit").unwrap();
        assert_eq!(limit.param_type, ParamType::Integer);
        assert_eq!(limit.default, Some(json!(10)));
        assert_eq!(meta.describe()["returns"], json!({}));
    }

    #[test]
    fn unserializable_and_opaque_defaults() {
        let mut grid = HashMap::new();
        grid.insert((0u8, 0u8), 1u8);
        let decl = ToolDeclaration::new("grid", module_path!(), noop)
            .param(ParamSpec::optional("grid", grid))
            .param(
                ParamSpec::untyped("host")
                    .with_default_value(opaque_default(&std::net::Ipv4Addr::LOCALHOST)),
            );

        let meta = extract(&decl);
        let grid = meta.parameter("grid").unwrap();
        assert!(!grid.required);
        assert!(grid.default.as_ref().unwrap().as_str().unwrap().starts_with("<HashMap"));
        assert_eq!(
            meta.parameter("host").unwrap().default,
            Some(json!("<Ipv4Addr: 127.0.0.1>"))
        );
    }

    #[test]
    fn duplicate_parameter_yields_fallback() {
        let decl = ToolDeclaration::new("broken", module_path!(), noop)
            .doc(DOC)
            .param(ParamSpec::required::<String>("a"))
            .param(ParamSpec::required::<i64>("a"));

        assert!(try_extract(&decl).is_err());
        let meta = extract(&decl);
        assert_eq!(meta.description, "Function broken (metadata extraction failed)");
        assert!(meta.parameters.is_empty());
        assert!(meta.error.is_some());
        assert!(meta.describe()["error"].is_string());
    }

    #[test]
    fn parameter_order_is_declaration_order() {
        let decl = ToolDeclaration::new("ordered", module_path!(), noop)
            .param(ParamSpec::required::<String>("zeta"))
            .param(ParamSpec::required::<String>("alpha"));
        let keys: Vec<String> = extract(&decl).parameters_map().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
