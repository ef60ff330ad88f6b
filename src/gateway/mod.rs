//! HTTP surface
//!
//! One axum router carries the whole external API: chat (SSE event stream),
//! inbound event forwarding, session removal, the VNC bridge upgrade, and a
//! liveness probe. All shared state is injected at construction; there are
//! no process-wide statics.

mod handler;
mod server;

pub use handler::{router, GatewayState};
pub use server::serve;
