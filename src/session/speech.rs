//! Speech, wake-word and output boundaries of the session host.
//!
//! The engines themselves live outside this crate. The traits here are what a
//! host needs from them, plus the small implementations the console binary
//! uses.

use async_trait::async_trait;
use tokio::process::Command;

use crate::agent_core::errors::AgentError;
use crate::agent_core::types::TurnOutcome;

use super::host::Surface;

/// Speaks a finished reply.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), AgentError>;
}

/// Single-shot speech capture. `None` when nothing intelligible was heard.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn listen(&self) -> Result<Option<String>, AgentError>;
}

/// Background wake-word spotting. Both calls must be idempotent.
pub trait WakeWordDetector: Send + Sync {
    fn start(&self) -> Result<(), AgentError>;
    fn stop(&self) -> Result<(), AgentError>;
}

/// Receives each terminal outcome exactly once.
pub trait TerminalSink: Send + Sync {
    fn deliver(&self, surface: Surface, outcome: &TurnOutcome);
}

// ─── Implementations ─────────────────────────────────────────────────────────

/// Speaks through the macOS `say` command.
#[derive(Debug, Default, Clone)]
pub struct SayCommandSpeaker;

#[async_trait]
impl TextToSpeech for SayCommandSpeaker {
    async fn speak(&self, text: &str) -> Result<(), AgentError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let status = Command::new("say")
            .arg(text)
            .status()
            .await
            .map_err(|e| AgentError::Speech {
                reason: format!("failed to run say: {e}"),
            })?;

        if !status.success() {
            return Err(AgentError::Speech {
                reason: format!("say exited with {status}"),
            });
        }
        Ok(())
    }
}

/// Discards speech. Used when replies are only printed.
#[derive(Debug, Default, Clone)]
pub struct SilentSpeaker;

#[async_trait]
impl TextToSpeech for SilentSpeaker {
    async fn speak(&self, _text: &str) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Detector for hosts without wake-word spotting.
#[derive(Debug, Default, Clone)]
pub struct NoWakeWord;

impl WakeWordDetector for NoWakeWord {
    fn start(&self) -> Result<(), AgentError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Prints outcomes to stdout.
#[derive(Debug, Default, Clone)]
pub struct StdoutSink;

impl TerminalSink for StdoutSink {
    fn deliver(&self, surface: Surface, outcome: &TurnOutcome) {
        let prefix = match surface {
            Surface::Foreground => "assistant",
            Surface::Overlay => "overlay",
        };
        println!("{prefix}> {}", outcome.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_say_skips_blank_text() {
        assert!(SayCommandSpeaker.speak("   ").await.is_ok());
    }

    #[tokio::test]
    async fn test_silent_speaker() {
        assert!(SilentSpeaker.speak("hello").await.is_ok());
    }
}
