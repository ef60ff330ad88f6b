//! HTTP and WebSocket handlers
//!
//! Chat responses stream as server-sent events; the stream carries the
//! session's ordered progress events and ends after the terminal `DONE` or
//! `error`. The forward endpoint injects remotely produced events into the
//! local session's stream so a two-node deployment looks like one.

use crate::bridge::{run_bridge, BridgeContext};
use crate::config::AgentConfig;
use crate::event::forward::ForwardRequest;
use crate::event::{EventEmitter, ForwardService, SseEvent, SseEventType};
use crate::llm::LlmClient;
use crate::session::{AgentSession, SessionRegistry};
use crate::tool::ToolRegistry;
use crate::worker::WorkerClient;
use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct GatewayState {
    pub sessions: Arc<SessionRegistry>,
    pub llm: Arc<dyn LlmClient>,
    pub tools: Arc<ToolRegistry>,
    pub worker: Option<Arc<dyn WorkerClient>>,
    pub bridge: BridgeContext,
    pub forwarder: ForwardService,
    /// Partner node for sessions this node does not own
    pub peer: Option<(String, u16)>,
    pub agent_config: AgentConfig,
}

/// Build the full router
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/agents/:agent_id/chat", post(chat))
        .route("/agents/:agent_id/forward", post(forward))
        .route("/agents/:agent_id", delete(remove_agent))
        .route("/vnc", get(vnc_upgrade))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

/// Start an agent run and stream its events back as SSE.
///
/// 409 when a session with this id is already live; the existing session is
/// left untouched.
async fn chat(
    State(state): State<GatewayState>,
    Path(agent_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let (emitter, rx) = EventEmitter::channel();
    let session = Arc::new(AgentSession::new(
        agent_id.clone(),
        state.llm.clone(),
        state.tools.clone(),
        state.worker.clone(),
        emitter,
        state.agent_config.max_loop,
    ));

    if !state.sessions.create_session(session.clone()) {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "Session already exists"})),
        )
            .into_response();
    }

    tracing::info!(agent_id = %agent_id, "Chat run started");
    let run_session = session.clone();
    let registry = state.sessions.clone();
    tokio::spawn(async move {
        run_session.run(&request.message).await;
        // The receiver already holds every emitted event, so the agent id
        // can be reused while the stream is still draining.
        registry.remove_session(run_session.id());
        tracing::info!(agent_id = %run_session.id(), "Chat run finished");
    });

    // The stream includes the terminal event, then closes.
    let stream = UnboundedReceiverStream::new(rx)
        .scan(false, |finished, event| {
            if *finished {
                return futures::future::ready(None);
            }
            if matches!(event.event, SseEventType::Done | SseEventType::Error) {
                *finished = true;
            }
            futures::future::ready(Some(event))
        })
        .map(|event: SseEvent| {
            Ok::<Event, Infallible>(
                Event::default()
                    .event(event.event.as_str())
                    .data(event.data.to_string()),
            )
        });

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Inject a remotely produced event into the local session's stream.
///
/// 200 on delivery (a detached transport still counts as delivered), 404
/// when this node does not own the session and no peer is configured.
async fn forward(
    State(state): State<GatewayState>,
    Path(agent_id): Path<String>,
    Json(request): Json<ForwardRequest>,
) -> impl IntoResponse {
    if let Some(session) = state.sessions.get_session(&agent_id) {
        let event_type: SseEventType =
            serde_json::from_value(serde_json::Value::String(request.event_name.clone()))
                .unwrap_or(SseEventType::Unknown);
        session.emitter().emit(SseEvent {
            event: event_type,
            data: request.data,
        });
        return StatusCode::OK;
    }

    if let Some((host, port)) = &state.peer {
        state
            .forwarder
            .forward(host, *port, &agent_id, &request.event_name, request.data)
            .await;
        return StatusCode::OK;
    }

    tracing::warn!(agent_id = %agent_id, "Forward target session not found");
    StatusCode::NOT_FOUND
}

/// Remove a session; idempotent, in-flight work sheds its events silently
async fn remove_agent(
    State(state): State<GatewayState>,
    Path(agent_id): Path<String>,
) -> impl IntoResponse {
    state.sessions.remove_session(&agent_id);
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct VncQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Upgrade a frontend connection and bridge it to the worker's VNC endpoint
async fn vnc_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<VncQuery>,
    State(state): State<GatewayState>,
) -> impl IntoResponse {
    let bridge = state.bridge.clone();
    ws.on_upgrade(move |socket| run_bridge(socket, query.session_id, bridge))
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::llm::{ChatMessage, ChatStream};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct NullLlm;

    #[async_trait]
    impl LlmClient for NullLlm {
        async fn chat(&self, _messages: &[ChatMessage]) -> String {
            serde_json::json!({"choices": [{"message": {"content": "ok"}}]}).to_string()
        }

        async fn stream_chat(
            &self,
            _messages: &[ChatMessage],
            _tools: &[serde_json::Value],
        ) -> Option<ChatStream> {
            None
        }
    }

    fn test_state() -> GatewayState {
        GatewayState {
            sessions: Arc::new(SessionRegistry::new()),
            llm: Arc::new(NullLlm),
            tools: Arc::new(ToolRegistry::new()),
            worker: None,
            bridge: BridgeContext {
                registry: Arc::new(crate::bridge::BridgeRegistry::new()),
                worker_vnc_url: "ws://127.0.0.1:1".to_string(),
                config: BridgeConfig::default(),
            },
            forwarder: ForwardService::new(),
            peer: None,
            agent_config: AgentConfig::default(),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn chat_request(agent_id: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/agents/{agent_id}/chat"))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"hello"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_healthz_route() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_delete_route_for_unknown_agent_is_no_content() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/agents/nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_forward_route_for_unknown_session_is_404() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/agents/ghost/forward")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"eventName":"step","data":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_finished_run_frees_agent_id() {
        let state = test_state();
        let app = router(state.clone());

        let first = app.clone().oneshot(chat_request("agent-1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // The run is detached; wait for it to finish and vacate the registry.
        for _ in 0..100 {
            if state.sessions.get_session("agent-1").is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(state.sessions.get_session("agent-1").is_none());

        let second = app.oneshot(chat_request("agent-1")).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forward_into_local_session() {
        let state = test_state();
        let (emitter, mut rx) = EventEmitter::channel();
        let session = Arc::new(AgentSession::new(
            "agent-1",
            state.llm.clone(),
            state.tools.clone(),
            None,
            emitter,
            10,
        ));
        state.sessions.create_session(session);

        let status = forward(
            State(state.clone()),
            Path("agent-1".to_string()),
            Json(ForwardRequest {
                event_name: "step".to_string(),
                data: serde_json::json!({"id": "1"}),
            }),
        )
        .await
        .into_response()
        .status();

        assert_eq!(status, StatusCode::OK);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event, SseEventType::Step);
        assert_eq!(event.data["id"], "1");
    }

    #[tokio::test]
    async fn test_forward_unknown_session_without_peer_is_404() {
        let state = test_state();
        let status = forward(
            State(state),
            Path("ghost".to_string()),
            Json(ForwardRequest {
                event_name: "step".to_string(),
                data: serde_json::json!({}),
            }),
        )
        .await
        .into_response()
        .status();

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_remove_agent_is_idempotent() {
        let state = test_state();
        let status = remove_agent(State(state.clone()), Path("nobody".to_string()))
            .await
            .into_response()
            .status();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unknown_forward_event_name_still_delivered() {
        let state = test_state();
        let (emitter, mut rx) = EventEmitter::channel();
        let session = Arc::new(AgentSession::new(
            "agent-1",
            state.llm.clone(),
            state.tools.clone(),
            None,
            emitter,
            10,
        ));
        state.sessions.create_session(session);

        forward(
            State(state),
            Path("agent-1".to_string()),
            Json(ForwardRequest {
                event_name: "someday-new".to_string(),
                data: serde_json::json!(null),
            }),
        )
        .await;

        assert_eq!(rx.recv().await.unwrap().event, SseEventType::Unknown);
    }
}
