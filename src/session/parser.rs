//! Parsing of tagged LLM output
//!
//! The planner and executor prompts ask the model to wrap its structured
//! output in XML-ish tags (`<plan>`, `<step>`, `<tool_use>`). The model does
//! not always comply cleanly, so every extractor here is tolerant: a missing
//! tag yields `None`/empty rather than an error, and the caller decides
//! whether to re-prompt.

use crate::session::plan::{Plan, PlanStep};
use regex::Regex;

/// A tool invocation requested by the model; arguments stay raw until
/// schema-guided repair runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
}

fn tag_regex(tag: &str) -> Regex {
    // Tags never nest in model output; non-greedy across newlines is enough.
    Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")).expect("static tag pattern")
}

/// Content of the first `<tag>...</tag>` block, trimmed
pub fn parse_tag(content: &str, tag: &str) -> Option<String> {
    tag_regex(tag)
        .captures(content)
        .map(|c| c[1].trim().to_string())
}

/// Reasoning inside a `<think>` block, if the model emitted one
pub fn parse_thinking(content: &str) -> Option<String> {
    parse_tag(content, "think")
}

/// All `<tool_use>` blocks, in order of appearance
pub fn parse_tool_calls(content: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    for capture in tag_regex("tool_use").captures_iter(content) {
        let block = &capture[1];
        let name = parse_tag(block, "name");
        let arguments = parse_tag(block, "arguments");
        if let (Some(name), Some(arguments)) = (name, arguments) {
            calls.push(ToolCall { name, arguments });
        }
    }
    calls
}

/// Parse a `<plan>` block into a [`Plan`]; `None` when no plan tag or no
/// steps are present
pub fn parse_plan(content: &str) -> Option<Plan> {
    let plan_block = parse_tag(content, "plan")?;

    let mut steps = Vec::new();
    for capture in tag_regex("step").captures_iter(&plan_block) {
        let block = &capture[1];
        let id = parse_tag(block, "id").and_then(|s| s.parse::<u32>().ok());
        let description = parse_tag(block, "description");
        if let (Some(id), Some(description)) = (id, description) {
            steps.push(PlanStep::new(id, description));
        }
    }
    if steps.is_empty() {
        return None;
    }

    Some(Plan {
        id: uuid::Uuid::new_v4().to_string(),
        title: parse_tag(&plan_block, "title").unwrap_or_default(),
        goal: parse_tag(&plan_block, "goal").unwrap_or_default(),
        message: parse_tag(&plan_block, "message"),
        steps,
    })
}

/// Step descriptions from an updated-plan response
pub fn parse_step_descriptions(content: &str) -> Vec<String> {
    tag_regex("step")
        .captures_iter(content)
        .filter_map(|c| parse_tag(&c[1], "description").or_else(|| Some(c[1].trim().to_string())))
        .filter(|s| !s.is_empty())
        .collect()
}
