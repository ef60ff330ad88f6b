//! Chat messages and conversation memory

use crate::event::{SseEventType, ToolEventData};
use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry in a conversation.
///
/// `event_type` records which kind of progress event produced the entry so
/// memory compaction can find tool results; it is stripped before the
/// message goes over the wire to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip)]
    pub event_type: SseEventType,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            event_type: SseEventType::Message,
        }
    }

    pub fn with_event_type(role: Role, event_type: SseEventType, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            event_type,
        }
    }
}

/// Append-only, ordered conversation history.
///
/// Callers may append but never mutate or reorder past entries; `history()`
/// hands out an immutable view.
#[derive(Debug, Default)]
pub struct ChatMemory {
    history: Vec<ChatMessage>,
}

impl ChatMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message
    pub fn add(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    /// Immutable view of the full history, in insertion order
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Blank out tool-result payloads to shrink the context window.
    ///
    /// Replaces each tool event's args with a removal marker while keeping
    /// the entry itself in place, so ordering is untouched.
    pub fn compact(&mut self) {
        for message in &mut self.history {
            if message.event_type != SseEventType::Tool {
                continue;
            }
            if let Ok(mut data) = serde_json::from_str::<ToolEventData>(&message.content) {
                data.args.clear();
                data.args.insert(
                    "result".to_string(),
                    serde_json::Value::String("(removed)".to_string()),
                );
                if let Ok(content) = serde_json::to_string(&data) {
                    message.content = content;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_role_wire_values() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_message_decodes_without_event_type() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.event_type, SseEventType::Message);
    }

    #[test]
    fn test_memory_is_append_only_and_ordered() {
        let mut memory = ChatMemory::new();
        assert!(memory.is_empty());

        memory.add(ChatMessage::new(Role::System, "you are an agent"));
        memory.add(ChatMessage::new(Role::User, "hello"));
        memory.add(ChatMessage::new(Role::Assistant, "hi"));

        let history = memory.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history[2].content, "hi");
    }

    #[test]
    fn test_compact_blanks_tool_results_only() {
        let mut args = HashMap::new();
        args.insert(
            "output".to_string(),
            serde_json::Value::String("very long tool output".to_string()),
        );
        let tool_data = ToolEventData::new("browser", "browser_navigate", args);

        let mut memory = ChatMemory::new();
        memory.add(ChatMessage::new(Role::User, "go"));
        memory.add(ChatMessage::with_event_type(
            Role::Assistant,
            SseEventType::Tool,
            serde_json::to_string(&tool_data).unwrap(),
        ));

        memory.compact();

        assert_eq!(memory.history()[0].content, "go");
        let compacted: ToolEventData =
            serde_json::from_str(&memory.history()[1].content).unwrap();
        assert_eq!(compacted.args["result"], "(removed)");
        assert!(!compacted.args.contains_key("output"));
    }
}
