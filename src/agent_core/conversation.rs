//! ConversationHistory — the in-memory, append-only record of one session.
//!
//! Responsibilities:
//! - Append user, model and tool turns in order
//! - Keep every function call paired with its tool result
//! - Build the `contents` array for the model gateway

use crate::inference::types::{Content, ContentRole, Part};

use super::types::{Message, MessageContent, Role};

// ─── ConversationHistory ────────────────────────────────────────────────────

/// Ordered messages for a single conversation.
///
/// Only appends are exposed. A function call can only be recorded together
/// with its result, so a call is never left dangling before the next user turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    pub fn push_user_with_image(&mut self, text: impl Into<String>, image: Vec<u8>) {
        self.messages.push(Message::user_with_image(text, image));
    }

    pub fn push_model_text(&mut self, text: impl Into<String>) {
        self.messages.push(Message::model_text(text));
    }

    /// Append a function call and its result as one step.
    pub fn push_tool_exchange(
        &mut self,
        name: &str,
        arguments: serde_json::Value,
        result: impl Into<String>,
    ) {
        self.messages.reserve(2);
        self.messages.push(Message::function_call(name, arguments));
        self.messages.push(Message::tool_result(name, result));
    }

    /// The most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ─── Wire translation ───────────────────────────────────────────────────────

/// Serialize messages into the gateway's role/parts shape.
///
/// Attached images are not re-sent: a past image turn contributes its text only.
pub fn build_contents(messages: &[Message]) -> Vec<Content> {
    messages.iter().map(message_to_content).collect()
}

fn message_to_content(message: &Message) -> Content {
    match (&message.role, &message.content) {
        (Role::User, MessageContent::Text(text)) => {
            Content::new(ContentRole::User, vec![Part::text(text.as_str())])
        }
        (_, MessageContent::FunctionCall { name, arguments }) => Content::new(
            ContentRole::Model,
            vec![Part::function_call(name.as_str(), arguments.clone())],
        ),
        (_, MessageContent::ToolResult { name, result }) => Content::new(
            ContentRole::Tool,
            vec![Part::function_response(name.as_str(), result)],
        ),
        (Role::Model | Role::ToolResult, MessageContent::Text(text)) => {
            Content::new(ContentRole::Model, vec![Part::text(text.as_str())])
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
