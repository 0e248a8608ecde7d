//! Agent Core — the conversational orchestration layer.
//!
//! Submodules:
//! - `conversation`: Append-only history and its wire translation
//! - `tool_gate`: Per-turn decision whether tools are offered
//! - `orchestrator`: The request/dispatch/fallback loop
//! - `types`: Messages, turn state and outcomes
//! - `errors`: Host-level error types

pub mod conversation;
pub mod errors;
pub mod orchestrator;
pub mod tool_gate;
pub mod types;

// Re-exports for convenience
pub use conversation::ConversationHistory;
pub use errors::AgentError;
pub use orchestrator::OrchestrationEngine;
pub use tool_gate::{KeywordGate, ToolGate};
pub use types::{Message, MessageContent, Role, TurnOutcome, TurnState};
