//! User tracking, identification and deletion.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{has_entries, has_items, has_text, put, put_present, Body};
use crate::api::models::UserTrackResponse;
use crate::api::{handle_raw, handle_response, CallContext};
use crate::registry::{Arguments, ParamSpec, ToolDeclaration, ToolModule, ToolOutput};
use crate::safety::SafetyPolicy;
use crate::types::{Error, Result};

inventory::submit! {
    ToolModule::new(module_path!(), tools)
}

fn tools() -> Result<Vec<ToolDeclaration>> {
    Ok(vec![
        ToolDeclaration::new("track_user_data", module_path!(), track_user_data)
            .doc(TRACK_USER_DATA_DOC)
            .param(ParamSpec::optional("attributes", None::<Vec<Map<String, Value>>>))
            .param(ParamSpec::optional("events", None::<Vec<Map<String, Value>>>))
            .param(ParamSpec::optional("purchases", None::<Vec<Map<String, Value>>>))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
        ToolDeclaration::new("update_user_attributes", module_path!(), update_user_attributes)
            .doc(UPDATE_USER_ATTRIBUTES_DOC)
            .param(ParamSpec::optional("external_id", None::<String>))
            .param(ParamSpec::optional("user_alias", None::<Map<String, Value>>))
            .param(ParamSpec::optional("attributes", Map::new()))
            .param(ParamSpec::optional("update_existing_only", false))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
        ToolDeclaration::new("track_event", module_path!(), track_event)
            .doc(TRACK_EVENT_DOC)
            .param(ParamSpec::required::<String>("event_name"))
            .param(ParamSpec::optional("external_id", None::<String>))
            .param(ParamSpec::optional("user_alias", None::<Map<String, Value>>))
            .param(ParamSpec::optional("time", None::<String>))
            .param(ParamSpec::optional("properties", None::<Map<String, Value>>))
            .param(ParamSpec::optional("update_existing_only", false))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
        ToolDeclaration::new("track_purchase", module_path!(), track_purchase)
            .doc(TRACK_PURCHASE_DOC)
            .param(ParamSpec::required::<String>("product_id"))
            .param(ParamSpec::required::<String>("currency"))
            .param(ParamSpec::required::<f64>("price"))
            .param(ParamSpec::optional("external_id", None::<String>))
            .param(ParamSpec::optional("user_alias", None::<Map<String, Value>>))
            .param(ParamSpec::optional("quantity", 1))
            .param(ParamSpec::optional("time", None::<String>))
            .param(ParamSpec::optional("properties", None::<Map<String, Value>>))
            .param(ParamSpec::optional("update_existing_only", false))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
        ToolDeclaration::new("delete_user", module_path!(), delete_user)
            .doc(DELETE_USER_DOC)
            .param(ParamSpec::optional("external_id", None::<String>))
            .param(ParamSpec::optional("user_alias", None::<Map<String, Value>>))
            .param(ParamSpec::optional("braze_id", None::<String>))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .param(ParamSpec::optional("confirm", None::<bool>))
            .policy(SafetyPolicy::mutating().confirmed()),
        ToolDeclaration::new("identify_users", module_path!(), identify_users)
            .doc(IDENTIFY_USERS_DOC)
            .param(ParamSpec::required::<Vec<Map<String, Value>>>("aliases_to_identify"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
    ])
}

/// One user, by external id or alias.
#[derive(Debug, Deserialize)]
struct UserRef {
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    user_alias: Option<Map<String, Value>>,
}

impl UserRef {
    fn require(&self) -> Result<()> {
        if has_text(&self.external_id) || has_entries(&self.user_alias) {
            Ok(())
        } else {
            Err(Error::validation("Must provide either external_id or user_alias"))
        }
    }

    fn apply(self, object: &mut Body) -> Result<()> {
        put_present(object, "external_id", self.external_id)?;
        put_present(object, "user_alias", self.user_alias)
    }
}

async fn post_track(ctx: &CallContext, body: Body, operation: &str) -> Result<ToolOutput> {
    let response = ctx.api().post("users/track", &Value::Object(body)).await?;
    handle_response::<UserTrackResponse>(response, operation)
}

// =============================================================================
// users/track
// =============================================================================

const TRACK_USER_DATA_DOC: &str = "\
Track user attributes, custom events, and purchases in a single request.

This is the primary endpoint for updating user profiles and tracking behavior.
Multiple operations can be batched together.

Args:
    attributes: List of attribute objects. Each contains external_id or
        user_alias, and custom attribute name/value pairs
    events: List of event objects. Each contains external_id or user_alias,
        name (required), time, and properties
    purchases: List of purchase objects. Each contains external_id or
        user_alias, product_id, currency, price, quantity, time, and properties
    dry_run: If true, validates but doesn't track
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Processing results and any errors
";

#[derive(Debug, Deserialize)]
struct TrackArgs {
    #[serde(default)]
    attributes: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    events: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    purchases: Option<Vec<Map<String, Value>>>,
}

async fn track_user_data(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: TrackArgs = args.parse()?;

    if !has_items(&args.attributes) && !has_items(&args.events) && !has_items(&args.purchases) {
        return Err(Error::validation(
            "Must provide at least one of: attributes, events, or purchases",
        ));
    }

    let mut body = Body::new();
    put_present(&mut body, "attributes", args.attributes)?;
    put_present(&mut body, "events", args.events)?;
    put_present(&mut body, "purchases", args.purchases)?;

    post_track(&ctx, body, "track user data").await
}

const UPDATE_USER_ATTRIBUTES_DOC: &str = "\
Update attributes for a single user.

Convenience wrapper around track_user_data for one user's attributes.

Args:
    external_id: User's external ID (provide this OR user_alias)
    user_alias: User alias object with alias_name and alias_label (provide
        this OR external_id)
    attributes: Attribute name/value pairs to set
    update_existing_only: If true, only update existing users (don't create new)
    dry_run: If true, validates but doesn't update
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Update confirmation
";

#[derive(Debug, Deserialize)]
struct UpdateAttributesArgs {
    #[serde(flatten)]
    user: UserRef,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    update_existing_only: bool,
}

async fn update_user_attributes(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: UpdateAttributesArgs = args.parse()?;
    args.user.require()?;

    let mut attribute = args.attributes;
    args.user.apply(&mut attribute)?;
    put(&mut attribute, "_update_existing_only", args.update_existing_only)?;

    post_track(&ctx, track_body("attributes", attribute), "track user data").await
}

const TRACK_EVENT_DOC: &str = "\
Track a custom event for a single user.

Args:
    event_name: Name of the custom event
    external_id: User's external ID (provide this OR user_alias)
    user_alias: User alias object (provide this OR external_id)
    time: ISO 8601 timestamp (defaults to now if not provided)
    properties: Custom event properties
    update_existing_only: If true, only track for existing users
    dry_run: If true, validates but doesn't track
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Tracking confirmation
";

#[derive(Debug, Deserialize)]
struct TrackEventArgs {
    event_name: String,
    #[serde(flatten)]
    user: UserRef,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    update_existing_only: bool,
}

async fn track_event(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: TrackEventArgs = args.parse()?;
    args.user.require()?;

    let mut event = Body::new();
    put(&mut event, "name", &args.event_name)?;
    args.user.apply(&mut event)?;
    put_present(&mut event, "time", args.time)?;
    put_present(&mut event, "properties", args.properties)?;
    put(&mut event, "_update_existing_only", args.update_existing_only)?;

    post_track(&ctx, track_body("events", event), "track user data").await
}

const TRACK_PURCHASE_DOC: &str = "\
Track a purchase for a single user.

Args:
    product_id: Product identifier
    currency: ISO 4217 currency code (e.g., USD, EUR, GBP)
    price: Price as a number
    external_id: User's external ID (provide this OR user_alias)
    user_alias: User alias object (provide this OR external_id)
    quantity: Number of items purchased (default 1)
    time: ISO 8601 timestamp (defaults to now if not provided)
    properties: Custom purchase properties
    update_existing_only: If true, only track for existing users
    dry_run: If true, validates but doesn't track
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Tracking confirmation
";

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct TrackPurchaseArgs {
    product_id: String,
    currency: String,
    price: f64,
    #[serde(flatten)]
    user: UserRef,
    #[serde(default = "one")]
    quantity: i64,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    update_existing_only: bool,
}

async fn track_purchase(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: TrackPurchaseArgs = args.parse()?;
    args.user.require()?;

    let mut purchase = Body::new();
    put(&mut purchase, "product_id", &args.product_id)?;
    put(&mut purchase, "currency", &args.currency)?;
    put(&mut purchase, "price", args.price)?;
    put(&mut purchase, "quantity", args.quantity)?;
    args.user.apply(&mut purchase)?;
    put_present(&mut purchase, "time", args.time)?;
    put_present(&mut purchase, "properties", args.properties)?;
    put(&mut purchase, "_update_existing_only", args.update_existing_only)?;

    post_track(&ctx, track_body("purchases", purchase), "track user data").await
}

fn track_body(kind: &str, object: Body) -> Body {
    let mut body = Body::new();
    body.insert(kind.to_string(), json!([object]));
    body
}

// =============================================================================
// Deletion and identification
// =============================================================================

const DELETE_USER_DOC: &str = "\
Delete a user from the Braze database.

WARNING: This is a destructive operation that cannot be undone.
The user will be permanently removed.

Args:
    external_id: User's external ID
    user_alias: User alias object with alias_name and alias_label
    braze_id: Braze's internal user ID
    dry_run: If true, validates but doesn't delete
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)
    confirm: Must be true to execute this destructive operation

Returns:
    Deletion confirmation
";

#[derive(Debug, Deserialize)]
struct DeleteUserArgs {
    #[serde(flatten)]
    user: UserRef,
    #[serde(default)]
    braze_id: Option<String>,
}

async fn delete_user(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: DeleteUserArgs = args.parse()?;

    if !has_text(&args.user.external_id)
        && !has_entries(&args.user.user_alias)
        && !has_text(&args.braze_id)
    {
        return Err(Error::validation(
            "Must provide one of: external_id, user_alias, or braze_id",
        ));
    }

    let mut body = Body::new();
    put_present(&mut body, "external_ids", args.user.external_id.filter(|s| !s.is_empty()).map(|id| [id]))?;
    put_present(&mut body, "user_aliases", args.user.user_alias.filter(|m| !m.is_empty()).map(|a| [a]))?;
    put_present(&mut body, "braze_ids", args.braze_id.filter(|s| !s.is_empty()).map(|id| [id]))?;

    let response = ctx.api().post("users/delete", &Value::Object(body)).await?;
    Ok(handle_raw(response, "delete user"))
}

const IDENTIFY_USERS_DOC: &str = "\
Identify users by associating an external_id with a user alias.

Merges profiles when a user's external_id becomes known after they were first
tracked under an alias only.

Args:
    aliases_to_identify: List of identification objects. Each contains
        external_id and user_alias with alias_name and alias_label
    dry_run: If true, validates but doesn't identify
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Identification results
";

#[derive(Debug, Deserialize)]
struct IdentifyArgs {
    aliases_to_identify: Vec<Map<String, Value>>,
}

async fn identify_users(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: IdentifyArgs = args.parse()?;

    let response = ctx
        .api()
        .post(
            "users/identify",
            &json!({"aliases_to_identify": args.aliases_to_identify}),
        )
        .await?;
    Ok(handle_raw(response, "identify users"))
}
