//! Sandcastle - agent sandbox orchestration runtime
//!
//! Sandcastle runs AI agent sessions against sandboxed workers. Each session
//! plans a task with an LLM, executes the plan through tools hosted in the
//! sandbox, and streams ordered progress events to the frontend. The runtime
//! also supervises worker liveness, relays events between backend nodes, and
//! bridges frontend WebSocket connections to the worker's desktop (VNC)
//! endpoint.
//!
//! Modules:
//! - [`session`]: agent sessions, the plan-act loop, and the registry
//! - [`llm`]: chat-completion client, conversation memory, argument repair
//! - [`tool`]: in-process tools and the name-keyed registry
//! - [`worker`]: remote worker tool protocol and heartbeat supervision
//! - [`event`]: typed progress events, emitters, cross-node forwarding
//! - [`modal`]: browser modal-state tracking and resolution
//! - [`bridge`]: frontend-to-worker VNC relay
//! - [`gateway`]: the HTTP surface tying it all together

pub mod bridge;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod llm;
pub mod modal;
pub mod session;
pub mod tool;
pub mod worker;

pub use config::SandcastleConfig;
pub use error::{Error, Result};
