//! Secondary skills dispatched from the conversation session
//!
//! The weather skill intercepts recognized weather queries before they reach
//! the chat model; the translation skill backs the `translate` trigger
//! action.

pub mod translation;
pub mod weather;
