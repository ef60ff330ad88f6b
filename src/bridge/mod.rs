//! Desktop viewing bridge: relays frontend WebSocket connections to the
//! worker's VNC endpoint without touching the framing

mod proxy;
mod registry;

pub use proxy::{run_bridge, BridgeContext};
pub use registry::{BridgePairing, BridgeRegistry};
