//! Chat messages and the request shape sent to the inference backend.

use crate::config::{MAX_TOKENS, SYSTEM_PROMPT};
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

/// Parses a `/api/chat` body into its message list.
///
/// The body must be a JSON object. A missing `messages` field yields an empty conversation.
pub fn parse_messages(body: &[u8]) -> anyhow::Result<Vec<ChatMessage>> {
    let value: Value = serde_json::from_slice(body).context("request body is not valid JSON")?;

    if !value.is_object() {
        bail!("request body is not a JSON object");
    }

    let request: ChatRequest =
        serde_json::from_value(value).context("request body has an invalid `messages` field")?;

    Ok(request.messages)
}

/// Puts the default system prompt at the front of the conversation unless one is already there.
///
/// Returns `true` if a message was inserted.
pub fn ensure_system_prompt(messages: &mut Vec<ChatMessage>) -> bool {
    if messages.iter().any(|m| m.role == Role::System) {
        return false;
    }

    messages.insert(0, ChatMessage::system(SYSTEM_PROMPT));
    true
}

/// Input for a single inference run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub stream: bool,
}

impl InferenceRequest {
    /// A streaming request with the fixed output budget.
    pub fn streaming(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: MAX_TOKENS,
            stream: true,
        }
    }
}
