//! Active bridge pairings
//!
//! One pairing per frontend connection id, covering both relay directions.
//! Registration happens only after the worker-side handshake succeeds, so a
//! listed pairing is always a live tunnel.

use std::collections::HashMap;
use std::sync::RwLock;

/// One established frontend/worker tunnel
#[derive(Debug, Clone)]
pub struct BridgePairing {
    pub frontend_id: String,
    pub session_id: Option<String>,
    pub worker_url: String,
    pub established_at: chrono::DateTime<chrono::Utc>,
}

/// Pairing table keyed by frontend connection id
#[derive(Default)]
pub struct BridgeRegistry {
    pairings: RwLock<HashMap<String, BridgePairing>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an established pairing.
    ///
    /// False when the frontend id is already paired; a connection id never
    /// carries two tunnels.
    pub fn register(
        &self,
        frontend_id: &str,
        session_id: Option<String>,
        worker_url: &str,
    ) -> bool {
        let mut pairings = self.pairings.write().unwrap_or_else(|e| e.into_inner());
        if pairings.contains_key(frontend_id) {
            tracing::warn!(frontend = %frontend_id, "Frontend already bridged");
            return false;
        }
        pairings.insert(
            frontend_id.to_string(),
            BridgePairing {
                frontend_id: frontend_id.to_string(),
                session_id,
                worker_url: worker_url.to_string(),
                established_at: chrono::Utc::now(),
            },
        );
        true
    }

    /// Drop a pairing when either side closes; idempotent
    pub fn remove(&self, frontend_id: &str) -> bool {
        self.pairings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(frontend_id)
            .is_some()
    }

    pub fn get(&self, frontend_id: &str) -> Option<BridgePairing> {
        self.pairings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(frontend_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.pairings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_remove() {
        let registry = BridgeRegistry::new();
        assert!(registry.register("fe-1", Some("agent-1".to_string()), "ws://worker:5902"));
        assert_eq!(registry.len(), 1);

        let pairing = registry.get("fe-1").unwrap();
        assert_eq!(pairing.session_id.as_deref(), Some("agent-1"));
        assert_eq!(pairing.worker_url, "ws://worker:5902");

        assert!(registry.remove("fe-1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_frontend_id_rejected() {
        let registry = BridgeRegistry::new();
        assert!(registry.register("fe-1", None, "ws://worker:5902"));
        assert!(!registry.register("fe-1", None, "ws://other:5902"));

        // The first pairing is untouched.
        assert_eq!(registry.get("fe-1").unwrap().worker_url, "ws://worker:5902");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = BridgeRegistry::new();
        registry.register("fe-1", None, "ws://worker:5902");
        assert!(registry.remove("fe-1"));
        assert!(!registry.remove("fe-1"));
        assert!(!registry.remove("never-registered"));
    }
}
