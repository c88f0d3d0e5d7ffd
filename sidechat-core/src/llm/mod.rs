//! LLM transport layer
//!
//! A single provider seam (`ChatProvider`) wraps the chat-completion
//! endpoint: one-shot generation for the intent classifier and a streamed
//! variant for chat turns. The wire format is the OpenAI-compatible
//! server-sent-event framing (`data: ` lines carrying JSON deltas,
//! terminated by `data: [DONE]`); its incremental decoding lives in `sse`
//! as a pure component.

pub mod provider;
pub mod sse;
pub mod zhipu;

pub use provider::{
    ChatMessage, ChatProvider, ChatRequest, ChatResponse, ChatStream, ChatStreamEvent,
    MessageRole, TransportError,
};
pub use zhipu::ZhipuProvider;
