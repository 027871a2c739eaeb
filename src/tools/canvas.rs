//! Canvas triggering and schedule management.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{has_items, put, put_present, Body};
use crate::api::models::CanvasResponse;
use crate::api::{handle_raw, handle_response, CallContext};
use crate::registry::{Arguments, ParamSpec, ToolDeclaration, ToolModule, ToolOutput};
use crate::safety::{RateLimitRule, SafetyPolicy};
use crate::types::{Error, Result};

inventory::submit! {
    ToolModule::new(module_path!(), tools)
}

fn tools() -> Result<Vec<ToolDeclaration>> {
    Ok(vec![
        ToolDeclaration::new("trigger_canvas", module_path!(), trigger_canvas)
            .doc(TRIGGER_CANVAS_DOC)
            .param(ParamSpec::required::<String>("canvas_id"))
            .param(ParamSpec::optional("recipients", None::<Vec<Map<String, Value>>>))
            .param(ParamSpec::optional("canvas_entry_properties", None::<Map<String, Value>>))
            .param(ParamSpec::optional("broadcast", false))
            .param(ParamSpec::optional("audience", None::<Map<String, Value>>))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating().rate_limited(RateLimitRule::Sends)),
        ToolDeclaration::new("schedule_canvas", module_path!(), schedule_canvas)
            .doc(SCHEDULE_CANVAS_DOC)
            .param(ParamSpec::required::<String>("canvas_id"))
            .param(ParamSpec::required::<String>("send_at"))
            .param(ParamSpec::optional("recipients", None::<Vec<Map<String, Value>>>))
            .param(ParamSpec::optional("canvas_entry_properties", None::<Map<String, Value>>))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating().rate_limited(RateLimitRule::Sends)),
        ToolDeclaration::new("update_canvas_schedule", module_path!(), update_canvas_schedule)
            .doc(UPDATE_CANVAS_SCHEDULE_DOC)
            .param(ParamSpec::required::<String>("canvas_id"))
            .param(ParamSpec::required::<String>("schedule_id"))
            .param(ParamSpec::required::<String>("send_at"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
        ToolDeclaration::new("delete_scheduled_canvas", module_path!(), delete_scheduled_canvas)
            .doc(DELETE_SCHEDULED_CANVAS_DOC)
            .param(ParamSpec::required::<String>("canvas_id"))
            .param(ParamSpec::required::<String>("schedule_id"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .param(ParamSpec::optional("confirm", None::<bool>))
            .policy(SafetyPolicy::mutating().confirmed()),
    ])
}

const TRIGGER_CANVAS_DOC: &str = "\
Trigger a Canvas for specified recipients.

Args:
    canvas_id: The Canvas identifier to trigger
    recipients: List of recipient objects. Each contains external_user_id or
        user_alias, and optional canvas_entry_properties
    canvas_entry_properties: Properties passed to all recipients (merged with
        individual recipient properties)
    broadcast: If true, send to the entire segment defined in the Canvas
    audience: Audience definition with connected_audience or segment filters
    dry_run: If true, validates but doesn't trigger
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Trigger confirmation with dispatch_id
";

#[derive(Debug, Deserialize)]
struct TriggerCanvasArgs {
    canvas_id: String,
    #[serde(default)]
    recipients: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    canvas_entry_properties: Option<Map<String, Value>>,
    #[serde(default)]
    broadcast: bool,
    #[serde(default)]
    audience: Option<Map<String, Value>>,
}

async fn trigger_canvas(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: TriggerCanvasArgs = args.parse()?;

    if !args.broadcast && !has_items(&args.recipients) {
        return Err(Error::validation("recipients is required when broadcast=false"));
    }

    let mut body = Body::new();
    put(&mut body, "canvas_id", &args.canvas_id)?;
    put(&mut body, "broadcast", args.broadcast)?;
    put_present(&mut body, "recipients", args.recipients)?;
    put_present(&mut body, "canvas_entry_properties", args.canvas_entry_properties)?;
    put_present(&mut body, "audience", args.audience)?;

    let response = ctx
        .api()
        .post("canvas/trigger/send", &Value::Object(body))
        .await?;
    handle_response::<CanvasResponse>(response, "trigger canvas")
}

const SCHEDULE_CANVAS_DOC: &str = "\
Schedule a Canvas to be triggered at a specific time.

Args:
    canvas_id: The Canvas identifier to schedule
    send_at: ISO 8601 timestamp for when to trigger the Canvas
    recipients: List of recipient objects (external_user_id or user_alias)
    canvas_entry_properties: Properties passed to all recipients
    dry_run: If true, validates but doesn't schedule
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Schedule confirmation with schedule_id
";

#[derive(Debug, Deserialize)]
struct ScheduleCanvasArgs {
    canvas_id: String,
    send_at: String,
    #[serde(default)]
    recipients: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    canvas_entry_properties: Option<Map<String, Value>>,
}

async fn schedule_canvas(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: ScheduleCanvasArgs = args.parse()?;

    if !has_items(&args.recipients) {
        return Err(Error::validation("recipients is required for scheduled Canvas"));
    }

    let mut body = Body::new();
    put(&mut body, "canvas_id", &args.canvas_id)?;
    put(&mut body, "send_at", &args.send_at)?;
    put_present(&mut body, "recipients", args.recipients)?;
    put_present(&mut body, "canvas_entry_properties", args.canvas_entry_properties)?;

    let response = ctx
        .api()
        .post("canvas/trigger/schedule/create", &Value::Object(body))
        .await?;
    handle_response::<CanvasResponse>(response, "schedule canvas")
}

const UPDATE_CANVAS_SCHEDULE_DOC: &str = "\
Update the trigger time for a scheduled Canvas.

Args:
    canvas_id: The Canvas identifier
    schedule_id: The schedule identifier to update
    send_at: New ISO 8601 timestamp for when to trigger
    dry_run: If true, validates but doesn't update
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Update confirmation
";

#[derive(Debug, Deserialize)]
struct CanvasSchedule {
    canvas_id: String,
    schedule_id: String,
}

#[derive(Debug, Deserialize)]
struct CanvasReschedule {
    #[serde(flatten)]
    schedule: CanvasSchedule,
    send_at: String,
}

async fn update_canvas_schedule(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: CanvasReschedule = args.parse()?;

    let mut body = Body::new();
    put(&mut body, "canvas_id", &args.schedule.canvas_id)?;
    put(&mut body, "schedule_id", &args.schedule.schedule_id)?;
    put(&mut body, "send_at", &args.send_at)?;

    let response = ctx
        .api()
        .post("canvas/trigger/schedule/update", &Value::Object(body))
        .await?;
    Ok(handle_raw(response, "update canvas schedule"))
}

const DELETE_SCHEDULED_CANVAS_DOC: &str = "\
Delete a scheduled Canvas trigger.

Args:
    canvas_id: The Canvas identifier
    schedule_id: The schedule identifier to delete
    dry_run: If true, validates but doesn't delete
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)
    confirm: Must be true to execute this operation

Returns:
    Deletion confirmation
";

async fn delete_scheduled_canvas(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: CanvasSchedule = args.parse()?;

    let mut body = Body::new();
    put(&mut body, "canvas_id", &args.canvas_id)?;
    put(&mut body, "schedule_id", &args.schedule_id)?;

    let response = ctx
        .api()
        .post("canvas/trigger/schedule/delete", &Value::Object(body))
        .await?;
    Ok(handle_raw(response, "delete scheduled canvas"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{args, mock_api, offline};
    use serde_json::json;

    #[tokio::test]
    async fn trigger_requires_recipients_unless_broadcast() {
        let err = trigger_canvas(offline(), args(json!({"canvas_id": "cv1"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("recipients is required when broadcast=false"));
    }

    #[tokio::test]
    async fn broadcast_trigger_posts_audience() {
        let api = mock_api().await;
        trigger_canvas(
            api.ctx.clone(),
            args(json!({
                "canvas_id": "cv1",
                "broadcast": true,
                "audience": {"AND": [{"custom_attribute": {"custom_attribute_name": "vip"}}]},
                "canvas_entry_properties": {},
            })),
        )
        .await
        .unwrap();

        let request = api.only_request();
        assert_eq!(request.path, "/canvas/trigger/send");
        assert_eq!(request.body["broadcast"], json!(true));
        assert!(request.body.get("audience").is_some());
        assert!(request.body.get("canvas_entry_properties").is_none());
    }

    #[tokio::test]
    async fn schedule_requires_recipients() {
        let err = schedule_canvas(
            offline(),
            args(json!({"canvas_id": "cv1", "send_at": "2030-01-01T00:00:00Z"})),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("recipients is required for scheduled Canvas"));
    }

    #[tokio::test]
    async fn update_schedule_posts_new_time() {
        let api = mock_api().await;
        update_canvas_schedule(
            api.ctx.clone(),
            args(json!({"canvas_id": "cv1", "schedule_id": "s1", "send_at": "2030-01-01T00:00:00Z"})),
        )
        .await
        .unwrap();
        assert_eq!(
            api.only_request().body,
            json!({"canvas_id": "cv1", "schedule_id": "s1", "send_at": "2030-01-01T00:00:00Z"})
        );
    }
}
