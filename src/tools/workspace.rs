//! Read-only view of the workspace and its write safety settings.

use serde_json::json;

use crate::api::CallContext;
use crate::registry::{Arguments, ToolDeclaration, ToolModule, ToolOutput};
use crate::safety::SafetyPolicy;
use crate::types::Result;

inventory::submit! {
    ToolModule::new(module_path!(), tools)
}

fn tools() -> Result<Vec<ToolDeclaration>> {
    Ok(vec![ToolDeclaration::new(
        "get_workspace_info",
        module_path!(),
        get_workspace_info,
    )
    .doc(GET_WORKSPACE_INFO_DOC)
    .policy(SafetyPolicy::read_only())])
}

const GET_WORKSPACE_INFO_DOC: &str = "\
Get information about the current workspace and its write safety settings.

Returns:
    Base URL, write flags, allowed workspace patterns and whether the
    workspace matches one of them
";

async fn get_workspace_info(ctx: CallContext, _args: Arguments) -> Result<ToolOutput> {
    let safety = ctx.safety();
    Ok(ToolOutput::raw(json!({
        "base_url": ctx.workspace(),
        "write_enabled": safety.write_enabled,
        "allow_production": safety.allow_production,
        "dry_run_default": safety.dry_run_default,
        "allowed_patterns": safety.allowed_workspaces,
        "is_safe": safety.is_allowed_workspace(ctx.workspace()),
    })))
}
