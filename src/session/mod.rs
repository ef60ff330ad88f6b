//! Agent sessions: plan-act loop, plan parsing, and the process-wide registry

mod agent;
mod parser;
mod plan;
mod planner;
mod registry;

pub use agent::{AgentSession, TaskStatus};
pub use parser::{parse_plan, parse_tag, parse_thinking, parse_tool_calls, ToolCall};
pub use plan::{Plan, PlanStep};
pub use planner::{Executor, Planner};
pub use registry::SessionRegistry;
