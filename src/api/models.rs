//! Response models for the REST API.
//!
//! Parsing is lenient: unknown fields are ignored, and a body that does not
//! fit its model at all is passed through raw by [`handle_response`](super::handle_response).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Campaign send and schedule responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CampaignResponse {
    pub message: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub dispatch_id: Option<String>,
    #[serde(default)]
    pub schedule_id: Option<String>,
}

/// Canvas trigger and schedule responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CanvasResponse {
    pub message: String,
    #[serde(default)]
    pub canvas_id: Option<String>,
    #[serde(default)]
    pub dispatch_id: Option<String>,
    #[serde(default)]
    pub schedule_id: Option<String>,
}

/// `users/track` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserTrackResponse {
    pub message: String,
    #[serde(default)]
    pub attributes_processed: Option<i64>,
    #[serde(default)]
    pub events_processed: Option<i64>,
    #[serde(default)]
    pub purchases_processed: Option<i64>,
    #[serde(default)]
    pub errors: Vec<Map<String, Value>>,
}

/// Catalog item responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogResponse {
    pub message: String,
    #[serde(default)]
    pub items_created: Option<i64>,
    #[serde(default)]
    pub items_updated: Option<i64>,
    #[serde(default)]
    pub items_deleted: Option<i64>,
}
