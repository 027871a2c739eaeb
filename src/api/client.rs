//! HTTP client for the REST API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::ToolOutput;
use crate::types::{ApiConfig, Error, Result};

/// Pooled client bound to one workspace.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

/// Successful (2xx) response, body unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| Error::configuration(format!("API key is not a valid header value: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Workspace base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        self.send(Method::DELETE, path, body).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        tracing::debug!(%method, %url, body = ?body, "Sending API request");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%method, %url, error = %e, "HTTP error");
            Error::Http(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(%method, %url, status = status.as_u16(), response = %text, "API returned error status");
            return Err(Error::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            body: text,
        })
    }
}

/// Decode a response as raw JSON.
pub fn handle_raw(response: ApiResponse, operation: &str) -> ToolOutput {
    match decode(response, operation) {
        Ok(value) | Err(value) => ToolOutput::raw(value),
    }
}

/// Decode a response into model `T`, falling back to raw JSON when it does not fit.
pub fn handle_response<T>(response: ApiResponse, operation: &str) -> Result<ToolOutput>
where
    T: DeserializeOwned + Serialize + JsonSchema,
{
    let value = match decode(response, operation) {
        Ok(value) => value,
        Err(failure) => return Ok(ToolOutput::raw(failure)),
    };

    match T::deserialize(&value) {
        Ok(model) => ToolOutput::model(&model),
        Err(e) => {
            tracing::warn!(
                operation,
                model = %T::schema_name(),
                error = %e,
                "Response did not match model, returning raw data"
            );
            Ok(ToolOutput::raw(value))
        }
    }
}

/// Parsed body, or the decode-failure payload.
fn decode(response: ApiResponse, operation: &str) -> std::result::Result<Value, Value> {
    match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => {
            tracing::debug!(operation, "Successfully completed");
            Ok(value)
        }
        Err(e) => {
            tracing::error!(operation, error = %e, "Failed to decode JSON response");
            Err(json!({
                "error": "Failed to decode response",
                "operation": operation,
                "raw_response": response.body,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::CampaignResponse;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{delete, post};
    use axum::{Json, Router};
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn raw(body: &str) -> ApiResponse {
        ApiResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn post_sends_bearer_and_json() {
        let router = Router::new().route(
            "/campaigns/trigger/send",
            post(|headers: AxumHeaders, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({"message": "success", "auth": auth, "echo": body}))
            }),
        );
        let base = serve(router).await;
        let client = ApiClient::new(&ApiConfig::new(base, "secret-key")).unwrap();

        let response = client
            .post("campaigns/trigger/send", &json!({"campaign_id": "c1"}))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(body["auth"], json!("Bearer secret-key"));
        assert_eq!(body["echo"], json!({"campaign_id": "c1"}));
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let router = Router::new().route(
            "/catalogs/shoes",
            delete(|| async { (StatusCode::NOT_FOUND, "no such catalog") }),
        );
        let base = serve(router).await;
        let client = ApiClient::new(&ApiConfig::new(base, "k")).unwrap();

        let err = client.delete("catalogs/shoes", None).await.unwrap_err();
        match err {
            Error::Api { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such catalog");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_surfaces_as_http_error() {
        let router = Router::new().route(
            "/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(router).await;
        let config = ApiConfig::new(base, "k").with_timeout(Duration::from_millis(100));
        let client = ApiClient::new(&config).unwrap();

        let err = client.post("slow", &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn undecodable_body_is_reported() {
        let out = handle_raw(raw("<html>oops</html>"), "send campaign").into_value();
        assert_eq!(
            out,
            json!({
                "error": "Failed to decode response",
                "operation": "send campaign",
                "raw_response": "<html>oops</html>",
            })
        );
    }

    #[test]
    fn matching_body_becomes_model() {
        let out = handle_response::<CampaignResponse>(
            raw(r#"{"message": "success", "dispatch_id": "d1", "extra": 1}"#),
            "send campaign",
        )
        .unwrap()
        .into_value();
        assert_eq!(out["schema"]["model_name"], json!("CampaignResponse"));
        assert_eq!(out["data"]["dispatch_id"], json!("d1"));
    }

    #[test]
    fn mismatched_body_stays_raw() {
        let out = handle_response::<CampaignResponse>(raw(r#"{"errors": []}"#), "send campaign")
            .unwrap()
            .into_value();
        assert_eq!(out, json!({"errors": []}));
    }
}
