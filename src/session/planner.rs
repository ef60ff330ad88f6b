//! Planner and executor prompts
//!
//! The planner turns a user request into a tagged `<plan>`; the executor
//! turns one step into `<tool_use>` invocations and, at the end of a run,
//! a concluding message. Both are thin prompt assemblies over the LLM
//! client; all parsing lives in [`crate::session::parser`].

use crate::llm::client::extract_content;
use crate::llm::{ChatMessage, LlmClient, Role};
use crate::session::plan::Plan;
use std::collections::HashMap;

const SYSTEM_PROMPT: &str = "You are an autonomous agent operating a sandboxed \
computer. You decompose tasks into small verifiable steps and use the available \
tools to carry them out. Always wrap structured output in the exact tags you \
are asked for.";

const CREATE_PLAN_PROMPT: &str = "Create a plan for the user's request. Respond \
with a <plan> block containing <title>, <goal>, an optional <message>, and one \
<step> per action, each with <id> and <description>. Keep steps small and \
concrete.";

const UPDATE_PLAN_PROMPT: &str = "The goal is: {{goal}}\n\nSteps so far (without \
result detail):\n{{steps}}\n\nLatest step result:\n{{step_result}}\n\nDecide \
whether more steps are needed to reach the goal. If so, respond with one <step> \
block per new step containing a <description>. If the goal is reached, respond \
with no <step> blocks.";

const EXECUTE_STEP_PROMPT: &str = "Available tools:\n{{available_tools}}\n\nThe \
overall goal is: {{goal}}\nCompleted steps:\n{{completed_steps}}\n\nExecute this \
step now: {{step}}\n\nRespond with one or more <tool_use> blocks, each with a \
<name> and JSON <arguments>.";

const CONCLUDE_PROMPT: &str = "The task is finished. Summarize what was done and \
the final answer for the user in plain language.";

/// Substitute `{{name}}` placeholders
fn render(template: &str, context: &HashMap<&str, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in context {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }
    out
}

/// Generates and revises plans
#[derive(Debug, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Ask for a fresh plan; returns the assistant's raw tagged content
    pub async fn create_plan(
        &self,
        llm: &dyn LlmClient,
        history: &[ChatMessage],
        input: &str,
    ) -> Option<String> {
        let mut messages = vec![ChatMessage::new(Role::System, SYSTEM_PROMPT)];
        messages.extend_from_slice(history);
        messages.push(ChatMessage::new(Role::User, CREATE_PLAN_PROMPT));
        messages.push(ChatMessage::new(Role::User, input));

        let response = llm.chat(&messages).await;
        extract_content(&response)
    }

    /// Ask whether the plan needs more steps after the latest result
    pub async fn update_plan(
        &self,
        llm: &dyn LlmClient,
        history: &[ChatMessage],
        plan: &Plan,
        latest_result: &str,
    ) -> Option<String> {
        let mut context = HashMap::new();
        context.insert("goal", plan.goal.clone());
        context.insert(
            "steps",
            serde_json::to_string(&plan.outline()).unwrap_or_default(),
        );
        context.insert("step_result", latest_result.to_string());

        let mut messages = vec![ChatMessage::new(Role::System, SYSTEM_PROMPT)];
        messages.extend_from_slice(history);
        messages.push(ChatMessage::new(
            Role::User,
            render(UPDATE_PLAN_PROMPT, &context),
        ));

        let response = llm.chat(&messages).await;
        extract_content(&response)
    }
}

/// Executes plan steps and concludes runs
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Ask for the tool invocations realizing one step
    pub async fn execute_step(
        &self,
        llm: &dyn LlmClient,
        goal: &str,
        step: &str,
        completed_steps: &str,
        tools_info: &str,
    ) -> Option<String> {
        let mut context = HashMap::new();
        context.insert("available_tools", tools_info.to_string());
        context.insert("goal", goal.to_string());
        context.insert("step", step.to_string());
        context.insert("completed_steps", completed_steps.to_string());

        let messages = vec![
            ChatMessage::new(Role::System, SYSTEM_PROMPT),
            ChatMessage::new(Role::User, render(EXECUTE_STEP_PROMPT, &context)),
        ];

        let response = llm.chat(&messages).await;
        extract_content(&response)
    }

    /// Message sequence for the final user-facing summary
    pub fn conclusion_messages(&self, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = history
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect();
        messages.push(ChatMessage::new(Role::User, CONCLUDE_PROMPT));
        messages
    }

    /// Ask for the final user-facing summary in one round-trip
    pub async fn conclude(&self, llm: &dyn LlmClient, history: &[ChatMessage]) -> Option<String> {
        let response = llm.chat(&self.conclusion_messages(history)).await;
        extract_content(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_all_placeholders() {
        let mut context = HashMap::new();
        context.insert("goal", "win".to_string());
        context.insert("step", "try".to_string());
        let rendered = render("goal={{goal}} step={{step}} goal={{goal}}", &context);
        assert_eq!(rendered, "goal=win step=try goal=win");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let rendered = render("{{missing}}", &HashMap::new());
        assert_eq!(rendered, "{{missing}}");
    }
}
