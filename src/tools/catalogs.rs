//! Catalog and catalog item management.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{put, Body};
use crate::api::models::CatalogResponse;
use crate::api::{handle_raw, handle_response, CallContext};
use crate::registry::{Arguments, ParamSpec, ToolDeclaration, ToolModule, ToolOutput};
use crate::safety::{RateLimitRule, SafetyPolicy};
use crate::types::{Error, Result};

inventory::submit! {
    ToolModule::new(module_path!(), tools)
}

fn tools() -> Result<Vec<ToolDeclaration>> {
    let item_policy = SafetyPolicy::mutating().rate_limited(RateLimitRule::CatalogUpdates);

    Ok(vec![
        ToolDeclaration::new("create_catalog_items", module_path!(), create_catalog_items)
            .doc(CREATE_CATALOG_ITEMS_DOC)
            .param(ParamSpec::required::<String>("catalog_name"))
            .param(ParamSpec::required::<Vec<Map<String, Value>>>("items"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(item_policy),
        ToolDeclaration::new("update_catalog_items", module_path!(), update_catalog_items)
            .doc(UPDATE_CATALOG_ITEMS_DOC)
            .param(ParamSpec::required::<String>("catalog_name"))
            .param(ParamSpec::required::<Vec<Map<String, Value>>>("items"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(item_policy),
        ToolDeclaration::new("delete_catalog_items", module_path!(), delete_catalog_items)
            .doc(DELETE_CATALOG_ITEMS_DOC)
            .param(ParamSpec::required::<String>("catalog_name"))
            .param(ParamSpec::required::<Vec<String>>("item_ids"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .param(ParamSpec::optional("confirm", None::<bool>))
            .policy(item_policy.confirmed()),
        ToolDeclaration::new("create_catalog", module_path!(), create_catalog)
            .doc(CREATE_CATALOG_DOC)
            .param(ParamSpec::required::<String>("name"))
            .param(ParamSpec::required::<String>("description"))
            .param(ParamSpec::required::<Vec<Map<String, Value>>>("fields"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
        ToolDeclaration::new("delete_catalog", module_path!(), delete_catalog)
            .doc(DELETE_CATALOG_DOC)
            .param(ParamSpec::required::<String>("catalog_name"))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .param(ParamSpec::optional("confirm", None::<bool>))
            .policy(SafetyPolicy::mutating().confirmed()),
    ])
}

/// Catalog names end up in the URL path.
fn catalog_path(name: &str) -> Result<String> {
    if name.is_empty() || name.contains(['/', '?', '#']) {
        return Err(Error::validation(format!("invalid catalog_name: {:?}", name)));
    }
    Ok(format!("catalogs/{}", name))
}

// =============================================================================
// Items
// =============================================================================

const CREATE_CATALOG_ITEMS_DOC: &str = "\
Create new items in a catalog.

Args:
    catalog_name: Name of the catalog
    items: List of item objects to create. Each must have an id field and can
        have any custom fields
    dry_run: If true, validates but doesn't create
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Creation confirmation
";

const UPDATE_CATALOG_ITEMS_DOC: &str = "\
Update existing items in a catalog.

Args:
    catalog_name: Name of the catalog
    items: List of item objects to update. Each must have an id field matching
        an existing item
    dry_run: If true, validates but doesn't update
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Update confirmation
";

#[derive(Debug, Deserialize)]
struct ItemsArgs {
    catalog_name: String,
    items: Vec<Map<String, Value>>,
}

async fn create_catalog_items(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: ItemsArgs = args.parse()?;
    let path = format!("{}/items", catalog_path(&args.catalog_name)?);

    let response = ctx.api().post(&path, &json!({"items": args.items})).await?;
    handle_response::<CatalogResponse>(response, "create catalog items")
}

async fn update_catalog_items(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: ItemsArgs = args.parse()?;
    let path = format!("{}/items", catalog_path(&args.catalog_name)?);

    let response = ctx.api().put(&path, &json!({"items": args.items})).await?;
    handle_response::<CatalogResponse>(response, "update catalog items")
}

const DELETE_CATALOG_ITEMS_DOC: &str = "\
Delete items from a catalog.

Args:
    catalog_name: Name of the catalog
    item_ids: List of item IDs to delete
    dry_run: If true, validates but doesn't delete
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)
    confirm: Must be true to execute this destructive operation

Returns:
    Deletion confirmation
";

#[derive(Debug, Deserialize)]
struct DeleteItemsArgs {
    catalog_name: String,
    item_ids: Vec<String>,
}

async fn delete_catalog_items(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: DeleteItemsArgs = args.parse()?;
    let path = format!("{}/items", catalog_path(&args.catalog_name)?);

    let items: Vec<Value> = args.item_ids.iter().map(|id| json!({"id": id})).collect();
    let response = ctx.api().delete(&path, Some(&json!({"items": items}))).await?;
    handle_response::<CatalogResponse>(response, "delete catalog items")
}

// =============================================================================
// Catalogs
// =============================================================================

const CREATE_CATALOG_DOC: &str = "\
Create a new catalog.

Args:
    name: Name of the catalog (must be unique)
    description: Description of the catalog
    fields: List of field definitions. Each contains name and type (string,
        number, boolean, time)
    dry_run: If true, validates but doesn't create
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Catalog creation confirmation
";

#[derive(Debug, Deserialize)]
struct CreateCatalogArgs {
    name: String,
    description: String,
    fields: Vec<Map<String, Value>>,
}

async fn create_catalog(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: CreateCatalogArgs = args.parse()?;

    let mut catalog = Body::new();
    put(&mut catalog, "name", &args.name)?;
    put(&mut catalog, "description", &args.description)?;
    put(&mut catalog, "fields", &args.fields)?;

    let response = ctx
        .api()
        .post("catalogs", &json!({"catalogs": [catalog]}))
        .await?;
    Ok(handle_raw(response, "create catalog"))
}

const DELETE_CATALOG_DOC: &str = "\
Delete a catalog and all its items.

WARNING: This is a destructive operation that cannot be undone.
All items in the catalog will be permanently deleted.

Args:
    catalog_name: Name of the catalog to delete
    dry_run: If true, validates but doesn't delete
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)
    confirm: Must be true to execute this destructive operation

Returns:
    Deletion confirmation
";

#[derive(Debug, Deserialize)]
struct CatalogRef {
    catalog_name: String,
}

async fn delete_catalog(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: CatalogRef = args.parse()?;
    let path = catalog_path(&args.catalog_name)?;

    let response = ctx.api().delete(&path, None).await?;
    Ok(handle_raw(response, "delete catalog"))
}
