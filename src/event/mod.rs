//! Typed progress events streamed to the frontend
//!
//! Every agent-loop side effect (plan created, step started/finished, tool
//! invoked, message token streamed, error raised, run completed) becomes one
//! [`SseEvent`] envelope, pushed in emission order to whichever transport is
//! attached to the session.

mod emitter;
pub mod forward;

pub use emitter::{EventEmitter, EventReceiver};
pub use forward::ForwardService;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed tag set for event envelopes.
///
/// An unrecognized wire value decodes to [`SseEventType::Unknown`] rather
/// than failing deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SseEventType {
    #[serde(rename = "tool")]
    Tool,
    #[serde(rename = "step")]
    Step,
    #[default]
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "DONE")]
    Done,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "plan")]
    Plan,
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl SseEventType {
    /// Wire value of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            SseEventType::Tool => "tool",
            SseEventType::Step => "step",
            SseEventType::Message => "message",
            SseEventType::Error => "error",
            SseEventType::Done => "DONE",
            SseEventType::Title => "title",
            SseEventType::Plan => "plan",
            SseEventType::Unknown => "unknown",
        }
    }
}

/// Event envelope: `{"event": "<tag>", "data": {...}}`.
///
/// The `data` shape is always consistent with the `event` tag; construct
/// envelopes through the typed helpers below rather than by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseEvent {
    pub event: SseEventType,
    pub data: serde_json::Value,
}

impl SseEvent {
    pub fn plan(data: &PlanEventData) -> Self {
        Self {
            event: SseEventType::Plan,
            data: serde_json::to_value(data).unwrap_or_default(),
        }
    }

    pub fn step(data: &StepEventData) -> Self {
        Self {
            event: SseEventType::Step,
            data: serde_json::to_value(data).unwrap_or_default(),
        }
    }

    pub fn tool(data: &ToolEventData) -> Self {
        Self {
            event: SseEventType::Tool,
            data: serde_json::to_value(data).unwrap_or_default(),
        }
    }

    pub fn message(data: &MessageEventData) -> Self {
        Self {
            event: SseEventType::Message,
            data: serde_json::to_value(data).unwrap_or_default(),
        }
    }

    pub fn title(title: &str) -> Self {
        Self {
            event: SseEventType::Title,
            data: serde_json::Value::String(title.to_string()),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            event: SseEventType::Error,
            data: serde_json::Value::String(message.to_string()),
        }
    }

    pub fn done() -> Self {
        Self {
            event: SseEventType::Done,
            data: serde_json::Value::Null,
        }
    }
}

/// Step status within a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Payload for `plan` events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanEventData {
    pub id: String,
    pub title: String,
    pub goal: String,
    pub steps: Vec<StepEventData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<HashMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload for `step` events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEventData {
    pub timestamp: i64,
    pub status: StepStatus,
    pub id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_ids: Vec<i64>,
}

impl StepEventData {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            status: StepStatus::Pending,
            id: id.into(),
            description: description.into(),
            result: None,
            tool_ids: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self.timestamp = chrono::Utc::now().timestamp_millis();
        self
    }
}

/// Payload for `tool` events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEventData {
    pub timestamp: i64,
    pub name: String,
    pub function: String,
    pub args: HashMap<String, serde_json::Value>,
}

impl ToolEventData {
    pub fn new(
        name: impl Into<String>,
        function: impl Into<String>,
        args: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            name: name.into(),
            function: function.into(),
            args,
        }
    }
}

/// Payload for `message` events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageEventData {
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_delta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content_delta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub think_time: Option<i64>,
}

impl MessageEventData {
    /// Full-content message payload
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            content: Some(text.into()),
            ..Default::default()
        }
    }

    /// Incremental token payload
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            content_delta: Some(text.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_values() {
        assert_eq!(
            serde_json::to_string(&SseEventType::Done).unwrap(),
            "\"DONE\""
        );
        assert_eq!(
            serde_json::to_string(&SseEventType::Plan).unwrap(),
            "\"plan\""
        );
        assert_eq!(
            serde_json::to_string(&SseEventType::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    #[test]
    fn test_unknown_tag_decodes_to_unknown() {
        let parsed: SseEventType = serde_json::from_str("\"no-such-event\"").unwrap();
        assert_eq!(parsed, SseEventType::Unknown);
        // round-trips through the same tag as_str reports
        let reparsed: SseEventType =
            serde_json::from_str(&serde_json::to_string(&parsed).unwrap()).unwrap();
        assert_eq!(reparsed, SseEventType::Unknown);
    }

    #[test]
    fn test_envelope_tag_matches_payload() {
        let step = StepEventData::new("1", "search the web").with_status(StepStatus::Running);
        let event = SseEvent::step(&step);
        assert_eq!(event.event, SseEventType::Step);
        assert_eq!(event.data["status"], "running");
        assert_eq!(event.data["description"], "search the web");
    }

    #[test]
    fn test_plan_payload_roundtrip() {
        let plan = PlanEventData {
            id: "p1".to_string(),
            title: "Weather check".to_string(),
            goal: "Find tomorrow's forecast".to_string(),
            steps: vec![StepEventData::new("1", "open the weather site")],
            status: "running".to_string(),
            ..Default::default()
        };
        let event = SseEvent::plan(&plan);
        let json = serde_json::to_string(&event).unwrap();
        let back: SseEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, SseEventType::Plan);
        assert_eq!(back.data["title"], "Weather check");
        // Optional fields never serialized when absent
        assert!(!json.contains("\"error\""));
    }
}
