//! In-process tools and the name-keyed registry

mod builtin;
mod registry;

pub use builtin::{CalculatorTool, MessageTool};
pub use registry::ToolRegistry;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Context map passed alongside tool input
pub type ToolContext = HashMap<String, serde_json::Value>;

/// A named capability invokable with free-form input, returning a text result
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn run(&self, input: &str, context: &ToolContext) -> Result<String>;
}
