//! The ordered conversation log and its channel slices

use serde::{Deserialize, Serialize};

use super::turn::{Channel, Role, Turn};
use crate::llm::ChatMessage;

/// Ordered sequence of turns; the single source of truth for restoring
/// session state. Grows monotonically and is only truncated by an explicit
/// clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Chat-channel context slice as wire messages. Weather turns never
    /// appear here; system notices are display-only and are skipped too.
    pub fn chat_context(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .filter(|turn| turn.channel == Channel::Chat && turn.role != Role::System)
            .map(|turn| ChatMessage {
                role: turn.role.as_message_role(),
                content: turn.content.as_text(),
            })
            .collect()
    }

    /// Weather-channel history as plain role/text pairs, used as
    /// disambiguation context by the intent classifier
    pub fn weather_context(&self) -> Vec<(String, String)> {
        self.turns
            .iter()
            .filter(|turn| turn.channel == Channel::Weather && turn.role != Role::System)
            .map(|turn| (turn.role.as_str().to_string(), turn.content.as_text()))
            .collect()
    }
}
