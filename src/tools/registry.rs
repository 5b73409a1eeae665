//! Explicit name→tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::tool::Tool;
use crate::provider::ToolDefinition;

/// Tools visible to one agent for one step, looked up by exact name.
///
/// Registration order is preserved so tool definitions reach the provider
/// in a stable order. Re-registering a name replaces the earlier tool in place.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => self.tools[slot] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name())
    }

    /// Tool definitions to advertise to the provider.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters().schema,
            })
            .collect()
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Tool>>>(iter: I) -> Self {
        let mut registry = Self::new();
        for tool in iter {
            registry.register(tool);
        }
        registry
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FunctionTool, ToolParameters};
    use serde_json::json;

    fn tool(name: &str, description: &str) -> Arc<dyn Tool> {
        Arc::new(FunctionTool::new(
            name,
            description,
            ToolParameters::empty(),
            |_args, _ctx| async { Ok(json!(null)) },
        ))
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let registry: ToolRegistry = [tool("search", "a")].into_iter().collect();
        assert!(registry.get("search").is_some());
        assert!(registry.get("Search").is_none());
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("a", "first"));
        registry.register(tool("b", "second"));
        registry.register(tool("a", "replaced"));

        let defs = registry.definitions();
        assert_eq!(registry.len(), 2);
        assert_eq!(defs[0].name, "a");
        assert_eq!(defs[0].description, "replaced");
        assert_eq!(defs[1].name, "b");
    }
}
