//! SessionHost — feeds user input into the shared engine and renders the result.
//!
//! Submits are fire-and-forget: the turn runs on the tokio runtime and its
//! outcome reaches the [`TerminalSink`]. One turn is in flight per engine;
//! overlapping submits are rejected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;

use crate::agent_core::errors::AgentError;
use crate::agent_core::orchestrator::OrchestrationEngine;
use crate::agent_core::types::TurnOutcome;

use super::speech::{
    NoWakeWord, SilentSpeaker, SpeechToText, TerminalSink, TextToSpeech, WakeWordDetector,
};

/// Which surface a host drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Chat window; history carries across turns.
    Foreground,
    /// Assistant overlay; each showing starts a fresh conversation.
    Overlay,
}

// ─── SharedEngine ────────────────────────────────────────────────────────────

/// One engine shared by every host, plus the in-flight flag that debounces them.
pub struct SharedEngine {
    engine: TokioMutex<OrchestrationEngine>,
    busy: AtomicBool,
}

impl SharedEngine {
    pub fn new(engine: OrchestrationEngine) -> Arc<Self> {
        Arc::new(Self {
            engine: TokioMutex::new(engine),
            busy: AtomicBool::new(false),
        })
    }

    /// Whether a turn is unresolved.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Lock the engine, e.g. to inspect history between turns.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, OrchestrationEngine> {
        self.engine.lock().await
    }

    /// Mark a turn in flight. The flag clears when the returned guard drops,
    /// including when the turn task panics.
    fn try_claim(self: &Arc<Self>) -> Result<BusyGuard, AgentError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| BusyGuard(self.clone()))
            .map_err(|_| AgentError::TurnInProgress)
    }
}

struct BusyGuard(Arc<SharedEngine>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::SeqCst);
    }
}

// ─── SessionHost ─────────────────────────────────────────────────────────────

/// Input to one turn.
enum TurnInput {
    Text(String),
    Image { prompt: String, image: Vec<u8> },
}

/// Adapter between a surface and the shared engine.
pub struct SessionHost {
    shared: Arc<SharedEngine>,
    surface: Surface,
    sink: Arc<dyn TerminalSink>,
    speaker: Arc<dyn TextToSpeech>,
    wake: Arc<dyn WakeWordDetector>,
    listener: Option<Arc<dyn SpeechToText>>,
    closed: Arc<AtomicBool>,
}

impl SessionHost {
    /// Host with silent speech and no wake-word detection.
    pub fn new(shared: Arc<SharedEngine>, surface: Surface, sink: Arc<dyn TerminalSink>) -> Self {
        Self {
            shared,
            surface,
            sink,
            speaker: Arc::new(SilentSpeaker),
            wake: Arc::new(NoWakeWord),
            listener: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_speaker(mut self, speaker: Arc<dyn TextToSpeech>) -> Self {
        self.speaker = speaker;
        self
    }

    pub fn with_wake_word(mut self, wake: Arc<dyn WakeWordDetector>) -> Self {
        self.wake = wake;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn SpeechToText>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Begin wake-word listening.
    pub fn start_listening(&self) {
        if let Err(e) = self.wake.start() {
            tracing::warn!(error = %e, "failed to start wake word detection");
        }
    }

    /// Schedule a text turn.
    pub fn submit_text(&self, input: &str) -> Result<JoinHandle<()>, AgentError> {
        self.schedule(TurnInput::Text(input.to_string()))
    }

    /// Schedule an image question. Bypasses the tool gate and loop.
    pub fn submit_image(&self, prompt: &str, image: Vec<u8>) -> Result<JoinHandle<()>, AgentError> {
        self.schedule(TurnInput::Image {
            prompt: prompt.to_string(),
            image,
        })
    }

    /// Handle one wake signal: stop detection, capture one utterance, submit it.
    ///
    /// An empty capture restarts detection and schedules nothing.
    pub async fn on_wake(&self) -> Result<Option<JoinHandle<()>>, AgentError> {
        self.ensure_open()?;
        if self.shared.is_busy() {
            return Err(AgentError::TurnInProgress);
        }
        let Some(listener) = self.listener.clone() else {
            return Err(AgentError::Speech {
                reason: "no speech-to-text configured".into(),
            });
        };

        self.stop_wake_word();
        let heard = match listener.listen().await {
            Ok(heard) => heard,
            Err(e) => {
                self.start_listening();
                return Err(e);
            }
        };

        match heard.filter(|t| !t.trim().is_empty()) {
            Some(transcript) => {
                tracing::info!(surface = ?self.surface, chars = transcript.len(), "wake capture");
                self.submit_text(&transcript).map(Some)
            }
            None => {
                tracing::debug!("empty wake capture");
                self.start_listening();
                Ok(None)
            }
        }
    }

    /// Drive [`on_wake`](Self::on_wake) from a channel of wake signals until
    /// the channel closes or the host is closed.
    pub async fn run_wake_loop(&self, mut signals: mpsc::Receiver<()>) {
        while signals.recv().await.is_some() {
            if self.is_closed() {
                break;
            }
            match self.on_wake().await {
                Ok(_) => {}
                Err(AgentError::TurnInProgress) => {
                    tracing::debug!("wake ignored: turn in progress");
                }
                Err(e) => tracing::warn!(error = %e, "wake handling failed"),
            }
        }
        tracing::debug!(surface = ?self.surface, "wake loop ended");
    }

    /// Show the host. The overlay starts a fresh conversation each time;
    /// the foreground surface keeps its history.
    pub async fn show_overlay(&self) -> Result<(), AgentError> {
        if self.shared.is_busy() {
            return Err(AgentError::TurnInProgress);
        }
        self.closed.store(false, Ordering::SeqCst);
        if self.surface == Surface::Overlay {
            self.shared.lock().await.start_new_conversation();
        }
        self.start_listening();
        Ok(())
    }

    /// Close the host. An in-flight turn still completes but its outcome is
    /// neither delivered nor spoken.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.stop_wake_word();
        tracing::info!(surface = ?self.surface, "session host closed");
    }

    fn ensure_open(&self) -> Result<(), AgentError> {
        if self.is_closed() {
            return Err(AgentError::Closed);
        }
        Ok(())
    }

    fn stop_wake_word(&self) {
        if let Err(e) = self.wake.stop() {
            tracing::warn!(error = %e, "failed to stop wake word detection");
        }
    }

    fn schedule(&self, input: TurnInput) -> Result<JoinHandle<()>, AgentError> {
        self.ensure_open()?;
        let busy = self.shared.try_claim()?;
        self.stop_wake_word();

        let shared = self.shared.clone();
        let sink = self.sink.clone();
        let speaker = self.speaker.clone();
        let wake = self.wake.clone();
        let closed = self.closed.clone();
        let surface = self.surface;

        Ok(tokio::spawn(async move {
            let outcome = {
                let mut engine = shared.lock().await;
                match input {
                    TurnInput::Text(text) => engine.process_user_input(&text).await,
                    TurnInput::Image { prompt, image } => engine.process_image(&prompt, image).await,
                }
            };

            if closed.load(Ordering::SeqCst) {
                tracing::info!(surface = ?surface, state = %outcome.state, "host closed; outcome discarded");
                return;
            }

            complete_turn(surface, &outcome, sink.as_ref(), speaker.as_ref()).await;
            drop(busy);
            if let Err(e) = wake.start() {
                tracing::warn!(error = %e, "failed to restart wake word detection");
            }
        }))
    }
}

/// Deliver once, speak once. Speech failures are logged only.
async fn complete_turn(
    surface: Surface,
    outcome: &TurnOutcome,
    sink: &dyn TerminalSink,
    speaker: &dyn TextToSpeech,
) {
    sink.deliver(surface, outcome);
    if let Err(e) = speaker.speak(&outcome.text).await {
        tracing::warn!(error = %e, "failed to speak reply");
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
