//! # sidechat-core
//!
//! Core runtime for sidechat, a streaming chat assistant with a secondary
//! weather skill. It was born as a browser side-panel extension; this crate
//! is the engine with the view peeled off.
//!
//! The building blocks:
//!
//! - `config/`: `sidechat.toml` loading, endpoint/model constants, and
//!   credential resolution.
//! - `storage/`: the key-value persistence shim (conversation log,
//!   credential, trigger channel) with change notifications.
//! - `llm/`: the chat-completion provider seam and the incremental decoder
//!   for the streamed `data:` wire format.
//! - `skills/`: weather intent extraction + forecast lookup, and the
//!   translation client.
//! - `session/`: the conversation session that ties it together: turn log,
//!   channel-sliced context, streaming turn cycle, trigger consumption.
//!
//! A front-end supplies a [`session::SessionObserver`] and drives
//! [`session::ConversationSession::submit`]; everything else (persistence,
//! skill dispatch, error rendering) happens behind that boundary.

pub mod config;
pub mod llm;
pub mod session;
pub mod skills;
pub mod storage;

pub use config::SidechatConfig;
pub use session::{ConversationSession, SessionError, SessionObserver};
