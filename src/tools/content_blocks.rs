//! Content block creation and updates.

use serde::Deserialize;
use serde_json::Value;

use super::{put, put_present, Body};
use crate::api::{handle_raw, CallContext};
use crate::registry::{Arguments, ParamSpec, ToolDeclaration, ToolModule, ToolOutput};
use crate::safety::SafetyPolicy;
use crate::types::{Error, Result};

inventory::submit! {
    ToolModule::new(module_path!(), tools)
}

fn tools() -> Result<Vec<ToolDeclaration>> {
    Ok(vec![
        ToolDeclaration::new("create_content_block", module_path!(), create_content_block)
            .doc(CREATE_CONTENT_BLOCK_DOC)
            .param(ParamSpec::required::<String>("name"))
            .param(ParamSpec::required::<String>("content"))
            .param(ParamSpec::optional("description", ""))
            .param(ParamSpec::optional("content_type", "html"))
            .param(ParamSpec::optional("tags", None::<Vec<String>>))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
        ToolDeclaration::new("update_content_block", module_path!(), update_content_block)
            .doc(UPDATE_CONTENT_BLOCK_DOC)
            .param(ParamSpec::required::<String>("content_block_id"))
            .param(ParamSpec::optional("name", None::<String>))
            .param(ParamSpec::optional("content", None::<String>))
            .param(ParamSpec::optional("description", None::<String>))
            .param(ParamSpec::optional("tags", None::<Vec<String>>))
            .param(ParamSpec::optional("dry_run", None::<bool>))
            .policy(SafetyPolicy::mutating()),
    ])
}

const CREATE_CONTENT_BLOCK_DOC: &str = "\
Create a new content block.

Content blocks are reusable content that can be referenced in messages.

Args:
    name: Name of the content block
    content: The actual content (HTML, text, or liquid)
    description: Optional description of the content block
    content_type: Type of content (html, text, or liquid). Defaults to html
    tags: Optional list of tags for organization
    dry_run: If true, validates but doesn't create
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Creation confirmation including content_block_id
";

fn default_content_type() -> String {
    "html".to_string()
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    name: String,
    content: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_content_type")]
    content_type: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

async fn create_content_block(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: CreateArgs = args.parse()?;

    let mut body = Body::new();
    put(&mut body, "name", &args.name)?;
    put(&mut body, "content", &args.content)?;
    put(&mut body, "content_type", &args.content_type)?;
    put_present(&mut body, "description", Some(args.description))?;
    put_present(&mut body, "tags", args.tags)?;

    let response = ctx
        .api()
        .post("content_blocks/create", &Value::Object(body))
        .await?;
    Ok(handle_raw(response, "create content block"))
}

const UPDATE_CONTENT_BLOCK_DOC: &str = "\
Update an existing content block.

Args:
    content_block_id: ID of the content block to update
    name: New name (optional)
    content: New content (optional)
    description: New description (optional)
    tags: New tags list (optional)
    dry_run: If true, validates but doesn't update
        (omitted or null follows BRAZE_DRY_RUN_DEFAULT)

Returns:
    Update confirmation
";

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    content_block_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

async fn update_content_block(ctx: CallContext, args: Arguments) -> Result<ToolOutput> {
    let args: UpdateArgs = args.parse()?;

    // Explicit empty values are updates too, so presence is all that counts.
    let mut body = Body::new();
    put(&mut body, "content_block_id", &args.content_block_id)?;
    if let Some(name) = args.name {
        put(&mut body, "name", name)?;
    }
    if let Some(content) = args.content {
        put(&mut body, "content", content)?;
    }
    if let Some(description) = args.description {
        put(&mut body, "description", description)?;
    }
    if let Some(tags) = args.tags {
        put(&mut body, "tags", tags)?;
    }

    if body.len() == 1 {
        return Err(Error::validation("Must provide at least one field to update"));
    }

    let response = ctx
        .api()
        .post("content_blocks/update", &Value::Object(body))
        .await?;
    Ok(handle_raw(response, "update content block"))
}
