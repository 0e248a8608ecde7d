//! Session host — the thin layer between a surface and the engine.
//!
//! - `host`: turn scheduling, debounce, wake flow and surfaces
//! - `speech`: speech, wake-word and output boundaries

pub mod host;
pub mod speech;

pub use host::{SessionHost, SharedEngine, Surface};
pub use speech::{
    NoWakeWord, SayCommandSpeaker, SilentSpeaker, SpeechToText, StdoutSink, TerminalSink,
    TextToSpeech, WakeWordDetector,
};
