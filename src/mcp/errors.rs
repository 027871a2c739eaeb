//! Error payloads returned to the client as tool results.
//!
//! Failures at the dispatch boundary never become protocol faults. Each one is
//! rendered as a JSON object with an `error` category the client can branch on.

use serde_json::{json, Value};

use crate::types::Error;

/// How many names `function_not_found` lists before truncating.
pub const SUGGESTED_FUNCTIONS: usize = 10;

pub fn function_not_found(function: &str, available: &[String]) -> Value {
    let shown: Vec<&String> = available.iter().take(SUGGESTED_FUNCTIONS).collect();
    json!({
        "error": "Function not found",
        "function": function,
        "message": format!("Function '{}' is not available", function),
        "available_functions": shown,
        "total_available": available.len(),
        "suggestion": "Use list_functions() to see all available functions",
    })
}

pub fn invalid_params(message: impl Into<String>, operation: &str) -> Value {
    json!({
        "error": "Invalid parameters",
        "operation": operation,
        "message": message.into(),
    })
}

pub fn internal(message: impl Into<String>, operation: &str) -> Value {
    json!({
        "error": "Internal error",
        "operation": operation,
        "message": message.into(),
    })
}

/// Render a failed call as a payload.
pub fn from_error(err: &Error, operation: &str) -> Value {
    match err {
        Error::Validation(msg) => invalid_params(msg.clone(), operation),
        Error::Serialization(e) => invalid_params(e.to_string(), operation),
        Error::WriteDisabled { .. } => json!({
            "error": "Write operations disabled",
            "operation": operation,
            "message": err.to_string(),
        }),
        Error::WorkspaceBlocked {
            workspace, allowed, ..
        } => json!({
            "error": "Workspace not allowed",
            "operation": operation,
            "workspace": workspace,
            "allowed_patterns": allowed,
            "message": err.to_string(),
        }),
        Error::RateLimited {
            current,
            limit,
            retry_after_secs,
            ..
        } => json!({
            "error": "Rate limit exceeded",
            "operation": operation,
            "current": current,
            "limit": limit,
            "retry_after_seconds": retry_after_secs,
            "message": err.to_string(),
        }),
        Error::Api { status, body } => json!({
            "error": "API error",
            "operation": operation,
            "status": status,
            "body": body,
            "message": err.to_string(),
        }),
        Error::Http(e) => json!({
            "error": "Transport error",
            "operation": operation,
            "timeout": e.is_timeout(),
            "message": err.to_string(),
        }),
        Error::NotFound(_)
        | Error::DuplicateTool(_)
        | Error::Configuration(_)
        | Error::Internal(_)
        | Error::Io(_) => internal(
            format!("Error calling function '{}'", operation),
            "call_function",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn not_found_lists_at_most_ten_names() {
        let names: Vec<String> = (0..15).map(|i| format!("tool_{:02}", i)).collect();
        let payload = function_not_found("nope", &names);
        assert_eq!(payload["error"], json!("Function not found"));
        assert_eq!(payload["function"], json!("nope"));
        assert_eq!(payload["message"], json!("Function 'nope' is not available"));
        assert_eq!(payload["available_functions"].as_array().unwrap().len(), 10);
        assert_eq!(payload["available_functions"][0], json!("tool_00"));
        assert_eq!(payload["total_available"], json!(15));
        assert_eq!(
            payload["suggestion"],
            json!("Use list_functions() to see all available functions")
        );
    }

    #[test]
    fn validation_becomes_invalid_parameters() {
        let payload = from_error(&Error::validation("segment_id is required"), "send_campaign");
        assert_eq!(
            payload,
            json!({
                "error": "Invalid parameters",
                "operation": "send_campaign",
                "message": "segment_id is required",
            })
        );
    }

    #[test]
    fn rate_limit_carries_counts() {
        let err = Error::RateLimited {
            operation: "send_campaign".to_string(),
            current: 3,
            limit: 3,
            retry_after_secs: 60,
        };
        let payload = from_error(&err, "send_campaign");
        assert_eq!(payload["error"], json!("Rate limit exceeded"));
        assert_eq!(payload["current"], json!(3));
        assert_eq!(payload["limit"], json!(3));
        assert_eq!(payload["retry_after_seconds"], json!(60));
    }

    #[test]
    fn gate_rejections_are_distinct() {
        let disabled = from_error(&Error::write_disabled("delete_user"), "delete_user");
        assert_eq!(disabled["error"], json!("Write operations disabled"));

        let blocked = Error::WorkspaceBlocked {
            operation: "delete_user".to_string(),
            workspace: "https://rest.iad-01.example.com".to_string(),
            allowed: vec!["demo-".to_string()],
        };
        let payload = from_error(&blocked, "delete_user");
        assert_eq!(payload["error"], json!("Workspace not allowed"));
        assert_eq!(payload["allowed_patterns"], json!(["demo-"]));
    }

    #[test]
    fn api_errors_keep_status_and_body() {
        let err = Error::Api {
            status: 400,
            body: "{\"message\":\"bad\"}".to_string(),
        };
        let payload = from_error(&err, "track_event");
        assert_eq!(payload["error"], json!("API error"));
        assert_eq!(payload["status"], json!(400));
    }

    #[test]
    fn everything_else_is_internal() {
        let payload = from_error(&Error::internal("boom"), "send_campaign");
        assert_eq!(
            payload,
            json!({
                "error": "Internal error",
                "operation": "call_function",
                "message": "Error calling function 'send_campaign'",
            })
        );
    }
}
