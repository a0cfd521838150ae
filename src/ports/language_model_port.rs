//! Language model port trait.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_MAX_TOKENS: u32 = 650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Outcome of a completion call. Failures are data here, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmReply {
    pub ok: bool,
    pub content: String,
    pub raw: serde_json::Value,
}

impl LlmReply {
    pub fn failed(content: impl Into<String>, raw: serde_json::Value) -> Self {
        Self {
            ok: false,
            content: content.into(),
            raw,
        }
    }
}

/// Chat-completion collaborator. Never fails past this boundary.
pub trait LanguageModelPort {
    fn chat(&self, request: &LlmRequest) -> LlmReply;
}
