//! Model Gateway — client for the remote `generateContent` API.
//!
//! This module handles all communication with the language model:
//! - Request building from conversation history (tool declarations optional)
//! - The HTTP round trip and its timeouts
//! - Parsing the reply into text, function call, or error
//! - Configuration loading from `config/assistant.yaml`
//!
//! Nothing here retries. Every failure comes back as [`ModelResponse::Error`]
//! carrying a retry hint, and the orchestration engine decides what to do.

pub mod client;
pub mod config;
pub mod errors;
pub mod parser;
pub mod types;

// Re-exports for convenience
pub use client::{GeminiGateway, ModelGateway};
pub use config::{AssistantConfig, DeviceConfig, EngineConfig, GatewayConfig};
pub use errors::GatewayError;
pub use types::ModelResponse;
