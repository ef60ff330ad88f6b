//! Sandcastle configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main Sandcastle configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandcastleConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Sandbox worker configuration
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Heartbeat supervisor configuration
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Desktop bridge configuration
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// `host:port` of the partner backend node, if sessions are spread
    /// across two nodes. Triggers for sessions this node does not own are
    /// relayed there.
    #[serde(default)]
    pub peer: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            peer: None,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completion endpoint base URL
    pub endpoint: String,

    /// API key sent as a bearer token
    pub api_key: String,

    /// Model identifier
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.siliconflow.cn/v1".to_string(),
            api_key: String::new(),
            model: "Qwen3-Next-80B-A3B-Instruct-int4g-fp16-mixed".to_string(),
        }
    }
}

/// Sandbox worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Base URL of the worker's tool-protocol endpoint
    pub tool_url: String,

    /// WebSocket URL of the worker's desktop-sharing (VNC) endpoint
    pub vnc_url: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tool_url: "http://worker:8081".to_string(),
            vnc_url: "ws://worker:5902".to_string(),
        }
    }
}

/// Heartbeat supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Interval between liveness probes, in seconds
    pub interval_secs: u64,

    /// Per-ping timeout, in seconds
    pub ping_timeout_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 120,
            ping_timeout_secs: 10,
        }
    }
}

/// Desktop bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Outbound handshake timeout, in seconds
    pub handshake_timeout_secs: u64,

    /// Receive buffer size in bytes, sized to hold one uncompressed
    /// video frame at the expected resolution
    pub recv_buffer_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: 10,
            recv_buffer_size: 1024 * 1024,
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on planner/executor iterations per run
    pub max_loop: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_loop: 10 }
    }
}

impl SandcastleConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Validate settings that have no usable default
    pub fn validate(&self) -> Result<()> {
        if self.llm.endpoint.is_empty() {
            return Err(Error::Config("llm.endpoint must not be empty".to_string()));
        }
        if let Some(peer) = &self.server.peer {
            let port_ok = peer
                .rsplit_once(':')
                .and_then(|(_, p)| p.parse::<u16>().ok())
                .is_some();
            if !port_ok {
                return Err(Error::Config(format!(
                    "server.peer must be host:port, got {}",
                    peer
                )));
            }
        }
        if !self.worker.vnc_url.starts_with("ws://") && !self.worker.vnc_url.starts_with("wss://") {
            return Err(Error::Config(format!(
                "worker.vnc_url must be a ws:// or wss:// URL, got {}",
                self.worker.vnc_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SandcastleConfig::default();
        assert_eq!(config.heartbeat.interval_secs, 120);
        assert_eq!(config.heartbeat.ping_timeout_secs, 10);
        assert_eq!(config.bridge.handshake_timeout_secs, 10);
        assert_eq!(config.bridge.recv_buffer_size, 1024 * 1024);
        assert_eq!(config.agent.max_loop, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sandcastle.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "0.0.0.0"
port = 9090

[llm]
endpoint = "https://llm.example.com/v1"
api_key = "sk-test"
model = "test-model"

[heartbeat]
interval_secs = 30
ping_timeout_secs = 5
"#,
        )
        .unwrap();

        let config = SandcastleConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.llm.model, "test-model");
        assert_eq!(config.heartbeat.interval_secs, 30);
        // Sections absent from the file fall back to defaults
        assert_eq!(config.bridge.handshake_timeout_secs, 10);
    }

    #[test]
    fn test_validate_rejects_bad_peer() {
        let mut config = SandcastleConfig::default();
        config.server.peer = Some("node-b".to_string());
        assert!(config.validate().is_err());

        config.server.peer = Some("node-b:8080".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_vnc_url() {
        let mut config = SandcastleConfig::default();
        config.worker.vnc_url = "http://worker:5902".to_string();
        assert!(config.validate().is_err());
    }
}
