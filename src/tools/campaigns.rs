//! Campaign sending and schedule management.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{has_items, has_text, put, put_present, Body};
use crate::api::models::CampaignResponse;
use crate::api::{handle_raw, handle_response, CallContext};
use crate::registry::{Arguments, ParamSpec, ToolDeclaration, ToolModule, ToolOutput};
use crate::safety::{RateLimitRule, SafetyPolicy};
use crate::types::{Error, Result};

inventory::submit! {
    ToolModule::new(module_path!(), tools)
}

fn tools() -> Result<Vec<ToolDeclaration>> {
    Ok(vec![
        ToolDeclaration::new("send_campaign", module_path!(), send_campaign)
            .doc(SEND_CAMPAIGN_DOC)
            .param(ParamSpec::required::<String>("campaign_id"))
            .param(ParamSpec::optional("send_id", None::<String>))
            .param(ParamSpec::optional("override_frequency_capping", false))
            .param(ParamSpec::optional("recipients", None::<Vec<Map<String, Value>>>))
            .param(ParamSpec::optional("segment_id", None::<String>))
            .param(ParamSpec::optional("broadcast", false))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating().rate_limited(RateLimitRule::Sends)),
        ToolDeclaration::new("schedule_campaign", module_path!(), schedule_campaign)
            .doc(SCHEDULE_CAMPAIGN_DOC)
            .param(ParamSpec::required::<String>("campaign_id"))
            .param(ParamSpec::required::<String>("send_at"))
            .param(ParamSpec::optional("recipients", None::<Vec<Map<String, Value>>>))
            .param(ParamSpec::optional("segment_id", None::<String>))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating().rate_limited(RateLimitRule::Sends)),
        ToolDeclaration::new("update_campaign_schedule", module_path!(), update_campaign_schedule)
            .doc(UPDATE_CAMPAIGN_SCHEDULE_DOC)
            .param(ParamSpec::required::<String>("campaign_id"))
            .param(ParamSpec::required::<String>("schedule_id"))
            .param(ParamSpec::required::<String>("send_at"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
        ToolDeclaration::new("delete_scheduled_campaign", module_path!(), delete_scheduled_campaign)
            .doc(DELETE_SCHEDULED_CAMPAIGN_DOC)
            .param(ParamSpec::required::<String>("campaign_id"))
            .param(ParamSpec::required::<String>("schedule_id"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .param(ParamSpec::optional("confirm", None::<bool>))
            .policy(SafetyPolicy::mutating().confirmed()),
    ])
}

// =============================================================================
// Sending
// =============================================================================

const SEND_CAMPAIGN_DOC: &str = "\
Send a campaign to specified recipients or segment.

This endpoint sends immediate campaign messages via API-triggered delivery.

Args:
    campaign_id: The campaign identifier to send
    send_id: Optional send identifier for tracking (generated if not provided)
    override_frequency_capping: If true, ignore frequency capping settings
    recipients: List of recipient objects. Each contains external_user_id or
        user_alias, and optional trigger_properties
    segment_id: ID of a segment to send to (alternative to recipients)
    broadcast: If true, send to the entire segment (requires segment_id)
    dry_run: If true, validates but doesn't send
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Send confirmation with dispatch_id
";

#[derive(Debug, Deserialize)]
struct SendCampaignArgs {
    campaign_id: String,
    #[serde(default)]
    send_id: Option<String>,
    #[serde(default)]
    override_frequency_capping: bool,
    #[serde(default)]
    recipients: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    segment_id: Option<String>,
    #[serde(default)]
    broadcast: bool,
}

async fn send_campaign(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: SendCampaignArgs = args.parse()?;

    if args.broadcast && !has_text(&args.segment_id) {
        return Err(Error::validation("segment_id is required when broadcast=true"));
    }
    if !args.broadcast && !has_items(&args.recipients) {
        return Err(Error::validation("recipients is required when broadcast=false"));
    }

    let mut body = Body::new();
    put(&mut body, "campaign_id", &args.campaign_id)?;
    put(&mut body, "broadcast", args.broadcast)?;
    put_present(&mut body, "send_id", args.send_id)?;
    if args.override_frequency_capping {
        put(&mut body, "override_frequency_capping", true)?;
    }
    put_present(&mut body, "recipients", args.recipients)?;
    put_present(&mut body, "segment_id", args.segment_id)?;

    let response = ctx
        .api()
        .post("campaigns/trigger/send", &Value::Object(body))
        .await?;
    handle_response::<CampaignResponse>(response, "send campaign")
}

const SCHEDULE_CAMPAIGN_DOC: &str = "\
Schedule a campaign to be sent at a specific time.

Args:
    campaign_id: The campaign identifier to schedule
    send_at: ISO 8601 timestamp for when to send the campaign
    recipients: List of recipient objects (external_user_id or user_alias)
    segment_id: ID of a segment to send to (alternative to recipients)
    dry_run: If true, validates but doesn't schedule
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Schedule confirmation with schedule_id
";

#[derive(Debug, Deserialize)]
struct ScheduleCampaignArgs {
    campaign_id: String,
    send_at: String,
    #[serde(default)]
    recipients: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    segment_id: Option<String>,
}

async fn schedule_campaign(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: ScheduleCampaignArgs = args.parse()?;

    if !has_items(&args.recipients) && !has_text(&args.segment_id) {
        return Err(Error::validation("Must provide either recipients or segment_id"));
    }

    let mut body = Body::new();
    put(&mut body, "campaign_id", &args.campaign_id)?;
    put(&mut body, "send_at", &args.send_at)?;
    put_present(&mut body, "recipients", args.recipients)?;
    put_present(&mut body, "segment_id", args.segment_id)?;

    let response = ctx
        .api()
        .post("campaigns/trigger/schedule/create", &Value::Object(body))
        .await?;
    handle_response::<CampaignResponse>(response, "schedule campaign")
}

// =============================================================================
// Schedule management
// =============================================================================

const UPDATE_CAMPAIGN_SCHEDULE_DOC: &str = "\
Update the send time for a scheduled campaign.

Args:
    campaign_id: The campaign identifier
    schedule_id: The schedule identifier to update
    send_at: New ISO 8601 timestamp for when to send
    dry_run: If true, validates but doesn't update
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Update confirmation
";

#[derive(Debug, Deserialize)]
struct ScheduleRef {
    campaign_id: String,
    schedule_id: String,
    #[serde(default)]
    send_at: Option<String>,
}

async fn update_campaign_schedule(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: ScheduleRef = args.parse()?;
    let Some(send_at) = args.send_at else {
        return Err(Error::validation("send_at is required"));
    };

    let mut body = Body::new();
    put(&mut body, "campaign_id", &args.campaign_id)?;
    put(&mut body, "schedule_id", &args.schedule_id)?;
    put(&mut body, "send_at", send_at)?;

    let response = ctx
        .api()
        .post("campaigns/trigger/schedule/update", &Value::Object(body))
        .await?;
    Ok(handle_raw(response, "update campaign schedule"))
}

const DELETE_SCHEDULED_CAMPAIGN_DOC: &str = "\
Delete a scheduled campaign send.

Args:
    campaign_id: The campaign identifier
    schedule_id: The schedule identifier to delete
    dry_run: If true, validates but doesn't delete
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)
    confirm: Must be true to execute this operation

Returns:
    Deletion confirmation
";

async fn delete_scheduled_campaign(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: ScheduleRef = args.parse()?;

    let mut body = Body::new();
    put(&mut body, "campaign_id", &args.campaign_id)?;
    put(&mut body, "schedule_id", &args.schedule_id)?;

    let response = ctx
        .api()
        .post("campaigns/trigger/schedule/delete", &Value::Object(body))
        .await?;
    Ok(handle_raw(response, "delete scheduled campaign"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{args, mock_api, offline};
    use serde_json::json;

    #[tokio::test]
    async fn broadcast_requires_segment() {
        let err = send_campaign(offline(), args(json!({"campaign_id": "c1", "broadcast": true})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("segment_id is required"));
    }

    #[tokio::test]
    async fn targeted_send_requires_recipients() {
        let err = send_campaign(offline(), args(json!({"campaign_id": "c1", "recipients": []})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn send_posts_only_present_fields() {
        let api = mock_api().await;
        let out = send_campaign(
            api.ctx.clone(),
            args(json!({
                "campaign_id": "c1",
                "recipients": [{"external_user_id": "u1"}],
                "send_id": "",
            })),
        )
        .await
        .unwrap()
        .into_value();

        let request = api.only_request();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/campaigns/trigger/send");
        assert_eq!(
            request.body,
            json!({
                "campaign_id": "c1",
                "broadcast": false,
                "recipients": [{"external_user_id": "u1"}],
            })
        );
        assert_eq!(out["data"]["message"], json!("success"));
        assert_eq!(out["schema"]["model_name"], json!("CampaignResponse"));
    }

    #[tokio::test]
    async fn schedule_needs_an_audience() {
        let err = schedule_campaign(
            offline(),
            args(json!({"campaign_id": "c1", "send_at": "2030-01-01T00:00:00Z"})),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Must provide either recipients or segment_id"));
    }

    #[tokio::test]
    async fn delete_posts_schedule_reference() {
        let api = mock_api().await;
        let out = delete_scheduled_campaign(
            api.ctx.clone(),
            args(json!({"campaign_id": "c1", "schedule_id": "s1"})),
        )
        .await
        .unwrap();

        let request = api.only_request();
        assert_eq!(request.path, "/campaigns/trigger/schedule/delete");
        assert_eq!(request.body, json!({"campaign_id": "c1", "schedule_id": "s1"}));
        assert_eq!(out.into_value(), json!({"message": "success"}));
    }

    #[test]
    fn declarations_carry_policies() {
        let decls = tools().unwrap();
        let delete = decls
            .iter()
            .find(|d| d.name() == "delete_scheduled_campaign")
            .unwrap();
        assert!(delete.safety_policy().confirm);
        let send = decls.iter().find(|d| d.name() == "send_campaign").unwrap();
        assert_eq!(send.safety_policy().rate_limit, Some(RateLimitRule::Sends));
    }
}
