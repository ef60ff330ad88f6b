//! Server assembly and lifecycle

use crate::bridge::{BridgeContext, BridgeRegistry};
use crate::config::SandcastleConfig;
use crate::error::{Error, Result};
use crate::event::ForwardService;
use crate::gateway::handler::{router, GatewayState};
use crate::llm::OpenAiClient;
use crate::session::SessionRegistry;
use crate::tool::{CalculatorTool, MessageTool, ToolRegistry};
use crate::worker::{HeartbeatService, HttpWorkerClient, WorkerClient};
use std::sync::Arc;

/// Wire every component together from config and run until interrupted.
///
/// Shutdown stops the heartbeat ticker first, then lets axum drain in-flight
/// connections (bridges included).
pub async fn serve(config: SandcastleConfig) -> Result<()> {
    config.validate()?;

    let llm = Arc::new(OpenAiClient::new(
        &config.llm.endpoint,
        &config.llm.api_key,
        &config.llm.model,
    ));

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(CalculatorTool));
    tools.register(Arc::new(MessageTool));

    let worker: Arc<dyn WorkerClient> = Arc::new(HttpWorkerClient::new(&config.worker.tool_url));

    let heartbeat = Arc::new(HeartbeatService::new(config.heartbeat.clone()));
    heartbeat.add_client(worker.clone()).await;
    let heartbeat_handle = heartbeat.spawn();

    let peer = config.server.peer.as_ref().and_then(|peer| {
        peer.rsplit_once(':')
            .and_then(|(host, port)| Some((host.to_string(), port.parse::<u16>().ok()?)))
    });

    let state = GatewayState {
        sessions: Arc::new(SessionRegistry::new()),
        llm,
        tools: Arc::new(tools),
        worker: Some(worker),
        bridge: BridgeContext {
            registry: Arc::new(BridgeRegistry::new()),
            worker_vnc_url: config.worker.vnc_url.clone(),
            config: config.bridge.clone(),
        },
        forwarder: ForwardService::new(),
        peer,
        agent_config: config.agent.clone(),
    };

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Sandcastle listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

    heartbeat_handle.stop();
    tracing::info!("Sandcastle stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
