//! Chat-completion client
//!
//! Two response modes: `chat` is a blocking single round-trip; `stream_chat`
//! opens a long-lived connection and hands back a raw byte stream the caller
//! reads until the remote signals completion.

use crate::llm::types::ChatMessage;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;

const CHAT_PATH: &str = "/chat/completions";

/// Handle on an in-flight streamed response
pub struct ChatStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: String,
}

impl ChatStream {
    /// Next raw chunk from the remote, `None` once the stream ends
    pub async fn next_chunk(&mut self) -> Option<reqwest::Result<Bytes>> {
        self.inner.next().await
    }

    /// Content deltas from the next complete SSE data lines.
    ///
    /// Reads chunks until at least one delta-bearing line is complete.
    /// `None` once the stream ends or on a transport error; a partial
    /// trailing line is held back for the next call.
    pub async fn next_deltas(&mut self) -> Option<Vec<String>> {
        loop {
            match self.inner.next().await? {
                Ok(chunk) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    let mut deltas = Vec::new();
                    while let Some(newline) = self.buffer.find('\n') {
                        let line = self.buffer[..newline].trim().to_string();
                        self.buffer.drain(..=newline);
                        if let Some(delta) = delta_from_sse_line(&line) {
                            deltas.push(delta);
                        }
                    }
                    if !deltas.is_empty() {
                        return Some(deltas);
                    }
                }
                Err(e) => {
                    tracing::warn!("LLM stream read failed: {}", e);
                    return None;
                }
            }
        }
    }
}

/// Content delta carried by one `data:` line, if any.
///
/// The `[DONE]` sentinel and role/finish frames carry no content and
/// yield `None`.
fn delta_from_sse_line(line: &str) -> Option<String> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload == "[DONE]" {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    value["choices"][0]["delta"]["content"]
        .as_str()
        .map(str::to_string)
}

/// Abstraction over a remote chat-completion endpoint
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single round-trip chat.
    ///
    /// Never fails: transport faults and non-2xx statuses come back as a
    /// well-formed response envelope whose content carries the error
    /// description, so the conversation loop survives transient provider
    /// errors.
    async fn chat(&self, messages: &[ChatMessage]) -> String;

    /// Streamed chat with optional function-calling tool definitions.
    ///
    /// `None` on any transport failure; an absent handle means "no response
    /// available, do not retry the same message automatically".
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> Option<ChatStream>;
}

/// OpenAI-compatible chat-completion client
pub struct OpenAiClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), CHAT_PATH)
    }

    /// Response envelope carrying an error description in the content slot
    fn error_envelope(description: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"content": description}}]
        })
        .to_string()
    }
}

/// Build the request body, reducing history to bare `{role, content}` pairs.
///
/// Reasoning-only fields and local metadata are stripped before
/// transmission; `tools` is attached only when non-empty.
fn build_body(
    model: &str,
    stream: bool,
    messages: &[ChatMessage],
    tools: &[serde_json::Value],
) -> serde_json::Value {
    let wire_messages: Vec<serde_json::Value> = messages
        .iter()
        .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = serde_json::json!({
        "model": model,
        "stream": stream,
        "messages": wire_messages,
    });
    if !tools.is_empty() {
        body["tools"] = serde_json::Value::Array(tools.to_vec());
    }
    body
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, messages: &[ChatMessage]) -> String {
        let started = std::time::Instant::now();
        let body = build_body(&self.model, false, messages, &[]);
        tracing::debug!(url = %self.chat_url(), "LLM chat request");

        let response = match self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("LLM chat transport failure: {}", e);
                return Self::error_envelope(&format!(
                    "Error occurred while processing the request: {}",
                    e
                ));
            }
        };

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "Error response from LLM");
            return Self::error_envelope(&format!(
                "Error response from server: {}",
                response.status()
            ));
        }

        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "LLM chat done");
        match response.text().await {
            Ok(text) => text,
            Err(e) => Self::error_envelope(&format!("Failed to read response body: {}", e)),
        }
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> Option<ChatStream> {
        let body = build_body(&self.model, true, messages, tools);
        tracing::debug!(url = %self.chat_url(), "LLM stream_chat request");

        let response = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await;

        match response {
            Ok(r) => Some(ChatStream {
                inner: r.bytes_stream().boxed(),
                buffer: String::new(),
            }),
            Err(e) => {
                tracing::error!("LLM stream_chat transport failure: {}", e);
                None
            }
        }
    }
}

/// Pull the assistant's content field out of a chat-completion envelope
pub fn extract_content(envelope: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(envelope).ok()?;
    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Role;

    fn history() -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, "you are an agent"),
            ChatMessage::new(Role::User, "hello"),
        ]
    }

    #[test]
    fn test_body_reduces_messages_to_role_content() {
        let body = build_body("test-model", false, &history(), &[]);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        // No tools field for a plain chat call
        assert!(body.get("tools").is_none());
        // Local metadata never goes over the wire
        assert!(body["messages"][0].get("event_type").is_none());
    }

    #[test]
    fn test_body_attaches_tools_when_present() {
        let tool = serde_json::json!({"type": "function", "function": {"name": "calc"}});
        let body = build_body("test-model", true, &history(), std::slice::from_ref(&tool));
        assert_eq!(body["stream"], true);
        assert_eq!(body["tools"][0]["function"]["name"], "calc");
    }

    #[test]
    fn test_error_envelope_is_well_formed() {
        let envelope = OpenAiClient::error_envelope("boom \"quoted\"");
        let content = extract_content(&envelope).unwrap();
        assert_eq!(content, "boom \"quoted\"");
    }

    #[tokio::test]
    async fn test_chat_degrades_on_unreachable_endpoint() {
        let client = OpenAiClient::new("http://127.0.0.1:1", "key", "model");
        let response = client.chat(&history()).await;
        let content = extract_content(&response).unwrap();
        assert!(content.contains("Error occurred while processing the request"));
    }

    #[tokio::test]
    async fn test_stream_chat_returns_none_on_transport_failure() {
        let client = OpenAiClient::new("http://127.0.0.1:1", "key", "model");
        assert!(client.stream_chat(&history(), &[]).await.is_none());
    }

    #[test]
    fn test_delta_from_sse_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"hel"}}]}"#;
        assert_eq!(delta_from_sse_line(line).unwrap(), "hel");

        assert!(delta_from_sse_line("data: [DONE]").is_none());
        assert!(delta_from_sse_line("").is_none());
        assert!(delta_from_sse_line(": keep-alive comment").is_none());
        // Role-announcement frames carry no content
        let role = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(delta_from_sse_line(role).is_none());
    }

    #[test]
    fn test_extract_content() {
        let envelope = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        assert_eq!(extract_content(envelope).unwrap(), "hi");
        assert!(extract_content("not json").is_none());
    }
}
