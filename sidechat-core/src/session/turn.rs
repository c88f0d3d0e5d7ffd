//! Turn and content types for the conversation log

use serde::{Deserialize, Serialize};

use crate::llm::MessageRole;
use crate::skills::weather::WeatherSummary;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Wire role for context slices sent to the chat endpoint
    pub fn as_message_role(&self) -> MessageRole {
        match self {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
            Role::System => MessageRole::System,
        }
    }
}

/// Which skill a turn belongs to. Slicing the log by channel keeps the two
/// skills out of each other's model context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Missing in logs written before channel-tagging existed
    #[default]
    Chat,
    Weather,
}

/// Renderable turn content. Serialized untagged so plain text persists as a
/// bare string, compatible with logs written before weather cards existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rendered {
    Text(String),
    WeatherCard(WeatherSummary),
}

impl Rendered {
    /// Plain-text form, used for context slices and text-only front-ends
    pub fn as_text(&self) -> String {
        match self {
            Rendered::Text(text) => text.clone(),
            Rendered::WeatherCard(summary) => summary.context_line(),
        }
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Rendered,
    #[serde(default)]
    pub channel: Channel,
}

impl Turn {
    pub fn user(text: impl Into<String>, channel: Channel) -> Self {
        Self {
            role: Role::User,
            content: Rendered::Text(text.into()),
            channel,
        }
    }

    pub fn assistant_text(text: impl Into<String>, channel: Channel) -> Self {
        Self {
            role: Role::Assistant,
            content: Rendered::Text(text.into()),
            channel,
        }
    }

    pub fn assistant_card(summary: WeatherSummary) -> Self {
        Self {
            role: Role::Assistant,
            content: Rendered::WeatherCard(summary),
            channel: Channel::Weather,
        }
    }

    pub fn system(text: impl Into<String>, channel: Channel) -> Self {
        Self {
            role: Role::System,
            content: Rendered::Text(text.into()),
            channel,
        }
    }
}
