//! Name-keyed tool lookup

use crate::tool::Tool;
use std::collections::HashMap;
use std::sync::Arc;

/// Mapping from tool name to capability.
///
/// Re-registering a name replaces the previous tool; last write wins by
/// design. Lookups never fail at the registry level — a missing key is an
/// `Option::None`, not an error.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace under `tool.name()`
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Snapshot of all registered tools; registry mutation never
    /// invalidates a caller's copy
    pub fn all(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().cloned().collect()
    }

    /// Snapshot of registered names
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}
