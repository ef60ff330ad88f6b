//! Remote sandboxed-worker tool protocol
//!
//! The worker hosts the real tools (shell, browser automation); this module
//! carries only the calling convention: list the worker's tool schemas,
//! invoke a tool by name, and probe liveness. The heartbeat supervisor
//! periodically pings every client in use and hands failures to that
//! client's own reconnect path.

mod client;
mod heartbeat;

pub use client::{HttpWorkerClient, ToolDescriptor, WorkerClient};
pub use heartbeat::{HeartbeatHandle, HeartbeatService};
