//! Console session host.
//!
//! Reads one utterance per line from stdin and prints each reply.
//!
//! Commands:
//! - `/image PATH PROMPT` — ask about an image file
//! - `/new` — start a fresh conversation
//! - `/quit` — exit

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use voiceloop::inference::config::load_or_default;
use voiceloop::session::{
    SayCommandSpeaker, SessionHost, SharedEngine, SilentSpeaker, StdoutSink, Surface,
    TextToSpeech,
};
use voiceloop::tools::ShellLauncher;

/// Set to `1` to speak replies with `say`.
const SPEAK_ENV: &str = "VOICELOOP_SPEAK";

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = voiceloop::init_tracing().context("failed to initialize logging")?;

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let (config, config_path) = load_or_default(&cwd).context("failed to load configuration")?;
    match &config_path {
        Some(path) => tracing::info!(path = %path.display(), "loaded config"),
        None => tracing::info!("no config file found; using defaults"),
    }

    let engine = voiceloop::build_engine(&config, Arc::new(ShellLauncher::new()))
        .context("failed to build engine")?;
    let shared = SharedEngine::new(engine);

    let speaker: Arc<dyn TextToSpeech> = if std::env::var(SPEAK_ENV).is_ok_and(|v| v == "1") {
        Arc::new(SayCommandSpeaker)
    } else {
        Arc::new(SilentSpeaker)
    };
    let host = SessionHost::new(shared.clone(), Surface::Foreground, Arc::new(StdoutSink))
        .with_speaker(speaker);
    host.start_listening();

    eprintln!("voiceloop {} — logging to {}", env!("CARGO_PKG_VERSION"), log_path.display());
    eprintln!("type a message, /image PATH PROMPT, /new or /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();

        let scheduled = if line == "/quit" {
            break;
        } else if line == "/new" {
            shared.lock().await.start_new_conversation();
            eprintln!("(new conversation)");
            continue;
        } else if let Some(rest) = line.strip_prefix("/image ") {
            let (path, prompt) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
            match tokio::fs::read(path).await {
                Ok(image) => host.submit_image(prompt, image),
                Err(e) => {
                    eprintln!("could not read {path}: {e}");
                    continue;
                }
            }
        } else {
            host.submit_text(line)
        };

        match scheduled {
            Ok(handle) => {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "turn task failed");
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    host.close();
    tracing::info!("=== voiceloop exiting ===");
    Ok(())
}
