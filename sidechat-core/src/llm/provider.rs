//! Provider abstraction for the chat-completion endpoint

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// Message roles accepted by the chat endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One message in a chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request shape shared by the one-shot and streaming paths
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: model.into(),
            max_tokens: None,
            temperature: None,
            stream: false,
        }
    }
}

/// Completed reply from the model
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub content: String,
}

/// Incremental streaming events
#[derive(Debug, Clone)]
pub enum ChatStreamEvent {
    /// One text fragment; concatenating deltas in emission order
    /// reconstructs the full reply
    Token { delta: String },
    /// Terminal event carrying the fully accumulated reply
    Completed { response: ChatResponse },
}

/// Lazy, finite, non-restartable stream of reply events
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamEvent, TransportError>> + Send>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Chat-completion provider seam. Implemented by the real HTTP client and by
/// scripted fakes in tests.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name, e.g. "zhipu"
    fn name(&self) -> &str;

    /// One-shot completion
    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse, TransportError>;

    /// Streamed completion. A non-2xx status fails here, before any event
    /// is produced.
    async fn stream(&self, request: ChatRequest) -> Result<ChatStream, TransportError>;
}
