//! Heartbeat supervisor for worker tool-protocol clients
//!
//! Every client in use by any session is registered here once, at creation
//! time; there is no de-registration on failure — reconnect logic owns
//! recovery, not removal. Each tick pings all clients in parallel, and one
//! client's failure never blocks or fails the probing of the others.

use crate::config::HeartbeatConfig;
use crate::worker::WorkerClient;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Handle for cancelling the heartbeat ticker at shutdown
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Periodic liveness probe over all registered worker clients
pub struct HeartbeatService {
    clients: Arc<RwLock<Vec<Arc<dyn WorkerClient>>>>,
    config: HeartbeatConfig,
}

impl HeartbeatService {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            clients: Arc::new(RwLock::new(Vec::new())),
            config,
        }
    }

    /// Register a client; append-once, never removed
    pub async fn add_client(&self, client: Arc<dyn WorkerClient>) {
        tracing::info!(client = %client.name(), "Registering worker client for heartbeat");
        self.clients.write().await.push(client);
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Probe every registered client in parallel, once.
    ///
    /// Each ping is bounded by the configured per-ping timeout so one hung
    /// client cannot stall the batch. A failed ping is logged and handed to
    /// that client's reconnect path; the tick itself always completes.
    pub async fn tick(&self) {
        let clients: Vec<Arc<dyn WorkerClient>> = self.clients.read().await.clone();
        if clients.is_empty() {
            return;
        }
        tracing::debug!(clients = clients.len(), "Heartbeat tick");

        let ping_timeout = Duration::from_secs(self.config.ping_timeout_secs);
        let probes = clients.iter().map(|client| {
            let client = client.clone();
            async move {
                let outcome = tokio::time::timeout(ping_timeout, client.ping()).await;
                match outcome {
                    Ok(Ok(())) => {
                        tracing::debug!(client = %client.name(), "Heartbeat ok");
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(
                            client = %client.name(),
                            "Heartbeat failed, triggering reconnect: {}",
                            e
                        );
                        if let Err(e) = client.reconnect().await {
                            tracing::warn!(client = %client.name(), "Reconnect failed: {}", e);
                        }
                    }
                    Err(_) => {
                        tracing::warn!(
                            client = %client.name(),
                            timeout_secs = ping_timeout.as_secs(),
                            "Heartbeat ping timed out, triggering reconnect"
                        );
                        if let Err(e) = client.reconnect().await {
                            tracing::warn!(client = %client.name(), "Reconnect failed: {}", e);
                        }
                    }
                }
            }
        });
        join_all(probes).await;
    }

    /// Start the recurring ticker.
    ///
    /// A tick slower than the interval skips the missed firings instead of
    /// running concurrent batches, bounding probe fan-out.
    pub fn spawn(self: &Arc<Self>) -> HeartbeatHandle {
        let service = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(service.config.interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First fire is immediate; skip it so the ticker probes on cadence.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                service.tick().await;
            }
        });
        HeartbeatHandle { task }
    }
}
