//! Frontend-to-worker WebSocket relay
//!
//! Upgrades a frontend connection, dials the worker's VNC endpoint, and
//! relays frames verbatim in both directions. The bridge never interprets
//! payloads; RFB stays opaque. Either side closing or erroring tears down
//! both sockets and removes the pairing.

use crate::bridge::registry::BridgeRegistry;
use crate::config::BridgeConfig;
use axum::extract::ws::{close_code, CloseFrame, Message as AxumMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::protocol::{Message as WsMessage, WebSocketConfig};

/// Everything a relay needs, injected at router construction
#[derive(Clone)]
pub struct BridgeContext {
    pub registry: Arc<BridgeRegistry>,
    pub worker_vnc_url: String,
    pub config: BridgeConfig,
}

/// Run one bridged connection to completion.
///
/// The frontend socket is already upgraded; the worker side is dialed here
/// under the configured handshake timeout. Handshake failure closes the
/// frontend with a server-error code and nothing is relayed.
pub async fn run_bridge(mut frontend: WebSocket, session_id: Option<String>, ctx: BridgeContext) {
    let frontend_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        frontend = %frontend_id,
        session = session_id.as_deref().unwrap_or("-"),
        worker = %ctx.worker_vnc_url,
        "Bridging VNC connection"
    );

    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(ctx.config.recv_buffer_size);
    ws_config.max_frame_size = Some(ctx.config.recv_buffer_size);

    let handshake = tokio::time::timeout(
        Duration::from_secs(ctx.config.handshake_timeout_secs),
        connect_async_with_config(ctx.worker_vnc_url.as_str(), Some(ws_config), false),
    )
    .await;

    let worker = match handshake {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            tracing::warn!(frontend = %frontend_id, error = %e, "Worker VNC handshake failed");
            close_with_error(&mut frontend, "worker connection failed").await;
            return;
        }
        Err(_) => {
            tracing::warn!(
                frontend = %frontend_id,
                timeout_secs = ctx.config.handshake_timeout_secs,
                "Worker VNC handshake timed out"
            );
            close_with_error(&mut frontend, "worker connection timed out").await;
            return;
        }
    };

    if !ctx
        .registry
        .register(&frontend_id, session_id, &ctx.worker_vnc_url)
    {
        close_with_error(&mut frontend, "connection already bridged").await;
        return;
    }

    let (mut frontend_tx, mut frontend_rx) = frontend.split();
    let (mut worker_tx, mut worker_rx) = worker.split();

    // Frontend → worker
    let uplink_id = frontend_id.clone();
    let uplink = tokio::spawn(async move {
        while let Some(Ok(message)) = frontend_rx.next().await {
            let outbound = match message {
                AxumMessage::Binary(data) => WsMessage::Binary(data),
                AxumMessage::Text(text) => WsMessage::Text(text),
                AxumMessage::Ping(data) => WsMessage::Ping(data),
                AxumMessage::Pong(data) => WsMessage::Pong(data),
                AxumMessage::Close(_) => break,
            };
            if worker_tx.send(outbound).await.is_err() {
                tracing::debug!(frontend = %uplink_id, "Worker send failed, closing uplink");
                break;
            }
        }
        let _ = worker_tx.send(WsMessage::Close(None)).await;
    });

    // Worker → frontend
    let downlink_id = frontend_id.clone();
    let downlink = tokio::spawn(async move {
        while let Some(Ok(message)) = worker_rx.next().await {
            let outbound = match message {
                WsMessage::Binary(data) => AxumMessage::Binary(data),
                WsMessage::Text(text) => AxumMessage::Text(text),
                WsMessage::Ping(data) => AxumMessage::Ping(data),
                WsMessage::Pong(data) => AxumMessage::Pong(data),
                WsMessage::Close(_) => break,
                WsMessage::Frame(_) => continue,
            };
            if frontend_tx.send(outbound).await.is_err() {
                tracing::debug!(frontend = %downlink_id, "Frontend send failed, closing downlink");
                break;
            }
        }
        let _ = frontend_tx.send(AxumMessage::Close(None)).await;
    });

    // Either direction ending tears down the whole bridge.
    tokio::select! {
        _ = uplink => {}
        _ = downlink => {}
    }

    ctx.registry.remove(&frontend_id);
    tracing::info!(frontend = %frontend_id, "Bridge closed");
}

async fn close_with_error(frontend: &mut WebSocket, reason: &str) {
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: Cow::Owned(reason.to_string()),
    };
    if let Err(e) = frontend.send(AxumMessage::Close(Some(frame))).await {
        tracing::debug!(error = %e, "Frontend already gone during error close");
    }
}
