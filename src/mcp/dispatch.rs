//! The two meta-tools clients see: `list_functions` and `call_function`.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::errors;
use crate::api::CallContext;
use crate::registry::schema::value_type_name;
use crate::registry::{Arguments, ToolRegistry};

const CALL_FUNCTION: &str = "call_function";

/// Routes meta-tool calls into the registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    context: CallContext,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, context: CallContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn list_functions(&self) -> Value {
        self.registry.list_functions()
    }

    /// Call a registered tool by name.
    ///
    /// `parameters` may be an object, a JSON string holding an object, or
    /// absent. Every failure comes back as an error payload.
    pub async fn call_function(&self, function_name: &str, parameters: Option<Value>) -> Value {
        if !self.registry.contains(function_name) {
            tracing::warn!(function = function_name, "Function not found");
            return errors::function_not_found(function_name, &self.registry.names());
        }

        let params = match parse_parameters(parameters) {
            Ok(params) => params,
            Err(message) => return errors::invalid_params(message, CALL_FUNCTION),
        };

        match self.registry.validate_params(function_name, &params) {
            Ok(problems) if !problems.is_empty() => {
                return errors::invalid_params(problems.join("; "), function_name);
            }
            Ok(_) => {}
            Err(err) => return errors::from_error(&err, function_name),
        }

        let result = self
            .registry
            .invoke(function_name, self.context.clone(), Arguments::from(params))
            .await;

        match result {
            Ok(output) => output.into_value(),
            Err(err) => {
                tracing::warn!(
                    function = function_name,
                    code = err.error_code(),
                    error = %err,
                    "Function call failed"
                );
                errors::from_error(&err, function_name)
            }
        }
    }
}

fn parse_parameters(parameters: Option<Value>) -> std::result::Result<Map<String, Value>, String> {
    match parameters {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err("Parameters string must parse to a JSON object/dictionary".to_string()),
            Err(_) => Err("Invalid JSON in parameters string".to_string()),
        },
        Some(other) => Err(format!(
            "Parameters must be a dictionary or JSON string, got {}",
            value_type_name(&other)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ParamSpec, ToolDeclaration, ToolOutput};
    use crate::safety::SafetyContext;
    use crate::types::{Error, Result, SafetyConfig};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn greet(_ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("name must be text"))?;
        Ok(ToolOutput::raw(json!({"greeting": format!("hello {}", name)})))
    }

    async fn explode(_ctx: CallContext, _args: Arguments) -> Result<ToolOutput> {
        Err(Error::internal("kaboom"))
    }

    fn dispatcher() -> Dispatcher {
        let safety = SafetyContext::new(SafetyConfig::default());
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDeclaration::new("greet", "tests", greet)
                    .doc("Say hello.\n\nArgs:\n    name: Who to greet\n")
                    .param(ParamSpec::optional("name", "world")),
                &safety,
            )
            .unwrap();
        registry
            .register(ToolDeclaration::new("explode", "tests", explode), &safety)
            .unwrap();
        Dispatcher::new(
            Arc::new(registry),
            CallContext::for_tests("https://rest.demo-01.example.com"),
        )
    }

    #[test]
    fn parameter_shapes() {
        assert!(parse_parameters(None).unwrap().is_empty());
        assert!(parse_parameters(Some(Value::Null)).unwrap().is_empty());
        assert_eq!(
            parse_parameters(Some(json!("{\"a\": 1}"))).unwrap()["a"],
            json!(1)
        );
        assert_eq!(
            parse_parameters(Some(json!("[1, 2]"))).unwrap_err(),
            "Parameters string must parse to a JSON object/dictionary"
        );
        assert_eq!(
            parse_parameters(Some(json!("{not json"))).unwrap_err(),
            "Invalid JSON in parameters string"
        );
        assert_eq!(
            parse_parameters(Some(json!(42))).unwrap_err(),
            "Parameters must be a dictionary or JSON string, got number"
        );
    }

    #[tokio::test]
    async fn calls_with_object_and_string_parameters() {
        let d = dispatcher();
        assert_eq!(
            d.call_function("greet", Some(json!({"name": "ada"}))).await,
            json!({"greeting": "hello ada"})
        );
        assert_eq!(
            d.call_function("greet", Some(json!("{\"name\": \"bob\"}"))).await,
            json!({"greeting": "hello bob"})
        );
    }

    #[tokio::test]
    async fn unknown_function_lists_names() {
        let out = dispatcher().call_function("missing", None).await;
        assert_eq!(out["error"], json!("Function not found"));
        assert_eq!(out["available_functions"], json!(["explode", "greet"]));
        assert_eq!(out["total_available"], json!(2));
    }

    #[tokio::test]
    async fn invalid_json_string_is_reported() {
        let out = dispatcher().call_function("greet", Some(json!("{oops"))).await;
        assert_eq!(
            out,
            json!({
                "error": "Invalid parameters",
                "operation": "call_function",
                "message": "Invalid JSON in parameters string",
            })
        );
    }

    #[tokio::test]
    async fn unknown_and_mistyped_parameters_are_rejected() {
        let out = dispatcher()
            .call_function("greet", Some(json!({"name": 3, "extra": true})))
            .await;
        assert_eq!(out["error"], json!("Invalid parameters"));
        assert_eq!(out["operation"], json!("greet"));
        let message = out["message"].as_str().unwrap();
        assert!(message.contains("Parameter 'name'"));
        assert!(message.contains("Unknown parameter: extra"));
    }

    #[tokio::test]
    async fn handler_failures_become_payloads() {
        let out = dispatcher().call_function("explode", None).await;
        assert_eq!(out["error"], json!("Internal error"));
        assert_eq!(out["message"], json!("Error calling function 'explode'"));
    }

    fn tool_dispatcher(config: SafetyConfig) -> Dispatcher {
        let safety = SafetyContext::new(config);
        let registry = ToolRegistry::build(&safety).unwrap();
        Dispatcher::new(
            Arc::new(registry),
            CallContext::for_tests("https://rest.demo-01.example.com"),
        )
    }

    #[tokio::test]
    async fn null_dry_run_follows_configured_default() {
        let d = tool_dispatcher(SafetyConfig {
            write_enabled: true,
            dry_run_default: true,
            ..SafetyConfig::default()
        });
        let out = d
            .call_function(
                "track_event",
                Some(json!({"external_id": "u1", "event_name": "signup", "dry_run": null})),
            )
            .await;
        assert_eq!(out["dry_run"], json!(true));
        assert_eq!(out["operation"], json!("track_event"));
    }

    #[tokio::test]
    async fn null_confirm_still_asks_for_confirmation() {
        let d = tool_dispatcher(SafetyConfig {
            write_enabled: true,
            ..SafetyConfig::default()
        });
        let out = d
            .call_function("delete_user", Some(json!({"external_id": "u1", "confirm": null})))
            .await;
        assert_eq!(out["error"], json!("Destructive operation requires confirmation"));
    }

    #[test]
    fn list_functions_delegates_to_registry() {
        let listing = dispatcher().list_functions();
        assert_eq!(listing["total_functions"], json!(2));
        assert_eq!(
            listing["available_functions"]["greet"]["parameters"]["name"]["description"],
            json!("Who to greet")
        );
    }
}
