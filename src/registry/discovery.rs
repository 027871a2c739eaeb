//! Link-time discovery of tool modules.
//!
//! Each tool module submits one [`ToolModule`] record:
//!
//! ```ignore
//! inventory::submit! {
//!     ToolModule::new(module_path!(), tools)
//! }
//! ```

use super::declaration::ToolDeclaration;
use crate::types::Result;

/// Namespace every tool module must live under.
pub const PLUGIN_NAMESPACE: &str = "braze_mcp_write::tools";

/// Tool names with this prefix are never registered.
pub const PRIVATE_PREFIX: &str = "_";

/// Registration record for one tool module.
#[derive(Debug)]
pub struct ToolModule {
    /// `module_path!()` of the submitting module.
    pub path: &'static str,
    /// Marker; modules with `false` are ignored.
    pub register_tools: bool,
    /// Builds the module's declarations.
    pub tools: fn() -> Result<Vec<ToolDeclaration>>,
}

impl ToolModule {
    pub const fn new(path: &'static str, tools: fn() -> Result<Vec<ToolDeclaration>>) -> Self {
        Self {
            path,
            register_tools: true,
            tools,
        }
    }

    pub const fn disabled(path: &'static str, tools: fn() -> Result<Vec<ToolDeclaration>>) -> Self {
        Self {
            path,
            register_tools: false,
            tools,
        }
    }
}

inventory::collect!(ToolModule);

/// Walks registered modules inside one namespace.
#[derive(Debug, Clone)]
pub struct Discovery {
    namespace: String,
}

impl Discovery {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Discovery over this crate's own tool namespace.
    pub fn plugin() -> Self {
        Self::new(PLUGIN_NAMESPACE)
    }

    /// Every declaration from every linked-in module, modules in path order.
    pub fn discover(&self) -> Vec<ToolDeclaration> {
        self.discover_from(inventory::iter::<ToolModule>)
    }

    pub fn discover_from<'a, I>(&self, modules: I) -> Vec<ToolDeclaration>
    where
        I: IntoIterator<Item = &'a ToolModule>,
    {
        let mut modules: Vec<&ToolModule> = modules
            .into_iter()
            .filter(|m| m.register_tools && self.within_namespace(m.path))
            .collect();
        modules.sort_by_key(|m| m.path);

        let mut declarations = Vec::new();
        for module in modules {
            match (module.tools)() {
                Ok(tools) => {
                    tracing::debug!(module = module.path, count = tools.len(), "Loaded tool module");
                    declarations.extend(tools);
                }
                Err(err) => {
                    tracing::warn!(module = module.path, error = %err, "Skipping tool module");
                }
            }
        }
        declarations
    }

    /// Whether a declaration may be registered.
    pub fn qualifies(&self, decl: &ToolDeclaration) -> bool {
        !decl.name().starts_with(PRIVATE_PREFIX) && self.within_namespace(decl.module())
    }

    fn within_namespace(&self, path: &str) -> bool {
        path.strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}
