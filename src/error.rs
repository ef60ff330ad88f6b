//! Sandcastle error types

use thiserror::Error;

/// Sandcastle error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM client error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Tool invocation error
    #[error("Tool error: {0}")]
    Tool(String),

    /// Tool-call argument parse/repair error
    #[error("Argument error: {0}")]
    Arguments(String),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Desktop bridge error
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// Cross-node forward error
    #[error("Forward error: {0}")]
    Forward(String),

    /// Remote worker protocol error
    #[error("Worker error: {0}")]
    Worker(String),

    /// Modal state error
    #[error("Modal error: {0}")]
    Modal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Sandcastle operations
pub type Result<T> = std::result::Result<T, Error>;
