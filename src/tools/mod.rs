//! Built-in tool modules.
//!
//! Every module here submits a [`ToolModule`](crate::registry::ToolModule)
//! record and is picked up by registry discovery. Handlers validate their own
//! argument combinations; the safety pipeline has already run by the time a
//! handler sees a call.

pub mod campaigns;
pub mod canvas;
pub mod catalogs;
pub mod content_blocks;
pub mod users;
pub mod workspace;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::Result;

/// Request body under construction.
pub(crate) type Body = Map<String, Value>;

/// Set `key` unconditionally.
pub(crate) fn put<T: Serialize>(body: &mut Body, key: &str, value: T) -> Result<()> {
    body.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

/// Set `key` only when `value` is present and not empty.
pub(crate) fn put_present<T: Serialize>(body: &mut Body, key: &str, value: Option<T>) -> Result<()> {
    if let Some(value) = value {
        let value = serde_json::to_value(value)?;
        if !is_blank(&value) {
            body.insert(key.to_string(), value);
        }
    }
    Ok(())
}

/// Null, empty string, empty array or empty object.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

pub(crate) fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

pub(crate) fn has_items<T>(value: &Option<Vec<T>>) -> bool {
    value.as_ref().is_some_and(|v| !v.is_empty())
}

pub(crate) fn has_entries(value: &Option<Map<String, Value>>) -> bool {
    value.as_ref().is_some_and(|m| !m.is_empty())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fake of the REST API for handler tests.

    use axum::extract::State;
    use axum::http::{Method, Uri};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    use crate::api::{ApiClient, CallContext};
    use crate::registry::Arguments;
    use crate::types::{ApiConfig, SafetyConfig};

    #[derive(Debug, Clone, PartialEq)]
    pub struct Recorded {
        pub method: String,
        pub path: String,
        pub body: Value,
    }

    type Log = Arc<Mutex<Vec<Recorded>>>;

    pub struct MockApi {
        pub ctx: CallContext,
        log: Log,
    }

    impl MockApi {
        pub fn requests(&self) -> Vec<Recorded> {
            self.log.lock().unwrap().clone()
        }

        pub fn only_request(&self) -> Recorded {
            let requests = self.requests();
            assert_eq!(requests.len(), 1, "expected exactly one request: {requests:?}");
            requests[0].clone()
        }
    }

    async fn record(State(log): State<Log>, method: Method, uri: Uri, body: String) -> Json<Value> {
        log.lock().unwrap().push(Recorded {
            method: method.to_string(),
            path: uri.path().to_string(),
            body: serde_json::from_str(&body).unwrap_or(Value::Null),
        });
        Json(json!({"message": "success"}))
    }

    /// Fake API that answers `{"message": "success"}` to everything.
    pub async fn mock_api() -> MockApi {
        let log: Log = Arc::default();
        let router = Router::new().fallback(record).with_state(Arc::clone(&log));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let api = ApiClient::new(&ApiConfig::new(format!("http://{addr}"), "test-key")).unwrap();
        MockApi {
            ctx: CallContext::new(api, Arc::new(SafetyConfig::default())),
            log,
        }
    }

    pub fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::from(map),
            other => panic!("arguments must be an object, got {other}"),
        }
    }

    /// Context for calls that must fail before any request is sent.
    pub fn offline() -> CallContext {
        CallContext::for_tests("http://127.0.0.1:9")
    }
}
