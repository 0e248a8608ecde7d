//! Shared types for the agent core.
//!
//! Conversation messages and the observable state of a turn.

use serde::{Deserialize, Serialize};

// ─── Conversation Messages ──────────────────────────────────────────────────

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    ToolResult,
}

/// Message payload. Structured variants replace string-encoded pseudo-types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    /// The model asked for a tool (role = Model).
    FunctionCall {
        name: String,
        arguments: serde_json::Value,
    },
    /// What the tool reported back (role = ToolResult).
    ToolResult { name: String, result: String },
}

/// Raw image bytes attached to a user turn on the image path.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedImage {
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for AttachedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AttachedImage({} bytes)", self.bytes.len())
    }
}

/// A single message in conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    /// Only set on user turns created by the image path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_image: Option<AttachedImage>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
            attached_image: None,
        }
    }

    pub fn user_with_image(text: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            attached_image: Some(AttachedImage { bytes: image }),
            ..Self::user(text)
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: MessageContent::Text(text.into()),
            attached_image: None,
        }
    }

    pub(crate) fn function_call(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            role: Role::Model,
            content: MessageContent::FunctionCall {
                name: name.into(),
                arguments,
            },
            attached_image: None,
        }
    }

    pub(crate) fn tool_result(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: MessageContent::ToolResult {
                name: name.into(),
                result: result.into(),
            },
            attached_image: None,
        }
    }

    /// The plain text, for text messages.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(t) => Some(t),
            _ => None,
        }
    }
}

// ─── Turn State ─────────────────────────────────────────────────────────────

/// Where the engine is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    Idle,
    AwaitingModelReply,
    Dispatching,
    FallbackRetry,
    TextTerminal,
    ErrorTerminal,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::TextTerminal | TurnState::ErrorTerminal)
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingModelReply => "awaiting_model_reply",
            TurnState::Dispatching => "dispatching",
            TurnState::FallbackRetry => "fallback_retry",
            TurnState::TextTerminal => "text_terminal",
            TurnState::ErrorTerminal => "error_terminal",
        };
        f.write_str(s)
    }
}

/// The single user-facing product of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub text: String,
    /// `TextTerminal` or `ErrorTerminal`.
    pub state: TurnState,
    /// Gateway calls issued during the turn.
    pub gateway_calls: u32,
}

impl TurnOutcome {
    pub fn is_error(&self) -> bool {
        self.state == TurnState::ErrorTerminal
    }
}
