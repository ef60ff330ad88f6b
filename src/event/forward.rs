//! Cross-node event forwarding
//!
//! In a horizontally-scaled deployment, agent sessions live on exactly one
//! backend node. When a trigger lands on a node that does not own the target
//! session, the event is relayed to the owner via HTTP. Forwarding is
//! best-effort: a non-200 response or I/O failure is logged and the event is
//! dropped, never retried, so a transient partner outage degrades to a
//! missed update instead of blocking the emitting session.
//!
//! The caller must already know the owning node's host and port; there is no
//! service discovery or session-to-node directory at this layer.

use serde::{Deserialize, Serialize};

/// Wire body of the forward POST
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    pub event_name: String,
    pub data: serde_json::Value,
}

/// Relays events to the backend node owning a given agent session
#[derive(Debug, Clone)]
pub struct ForwardService {
    client: reqwest::Client,
}

impl ForwardService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Forward one event to `http://{host}:{port}/agents/{agent_id}/forward`.
    ///
    /// Failures are logged and swallowed.
    pub async fn forward(
        &self,
        host: &str,
        port: u16,
        agent_id: &str,
        event_name: &str,
        data: serde_json::Value,
    ) {
        let url = format!("http://{}:{}/agents/{}/forward", host, port, agent_id);
        let body = ForwardRequest {
            event_name: event_name.to_string(),
            data,
        };

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                tracing::info!(
                    url = %url,
                    agent_id = %agent_id,
                    event = %event_name,
                    "Forwarded event"
                );
            }
            Ok(response) => {
                tracing::warn!(
                    url = %url,
                    status = %response.status(),
                    "Forward rejected, dropping event"
                );
            }
            Err(e) => {
                tracing::error!(
                    url = %url,
                    agent_id = %agent_id,
                    event = %event_name,
                    "Forward failed, dropping event: {}",
                    e
                );
            }
        }
    }
}

impl Default for ForwardService {
    fn default() -> Self {
        Self::new()
    }
}
