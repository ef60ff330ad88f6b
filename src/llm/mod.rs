//! LLM client abstraction and chat history
//!
//! - [`client`]: chat-completion client with blocking and streamed modes
//! - [`types`]: chat messages and append-only conversation memory
//! - [`repair`]: fault-tolerant tool-call argument decoding

pub mod client;
pub mod repair;
pub mod types;

pub use client::{ChatStream, LlmClient, OpenAiClient};
pub use repair::repair_arguments;
pub use types::{ChatMemory, ChatMessage, Role};
