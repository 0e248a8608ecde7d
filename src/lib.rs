pub mod agent_core;
pub mod inference;
pub mod session;
pub mod tools;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_core::{AgentError, OrchestrationEngine};
use inference::{AssistantConfig, GeminiGateway};
use tools::{DeviceLauncher, LocalCommandExecutor, ToolRegistry};

/// Environment variable that switches log output to JSON lines.
pub const LOG_JSON_ENV: &str = "VOICELOOP_LOG_JSON";

/// Return the platform-standard data directory for voiceloop.
///
/// - macOS: `~/Library/Application Support/voiceloop/`
/// - Windows: `{FOLDERID_RoamingAppData}\voiceloop\`
/// - Linux: `$XDG_DATA_HOME/voiceloop/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.voiceloop/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("voiceloop");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".voiceloop")
}

/// Wire the engine from configuration: gateway, built-in tools, local executor.
pub fn build_engine(
    config: &AssistantConfig,
    launcher: Arc<dyn DeviceLauncher>,
) -> Result<OrchestrationEngine, AgentError> {
    let executor = LocalCommandExecutor::new(config.device.clone(), launcher);
    let registry = ToolRegistry::builtin(Arc::new(executor));
    let gateway = GeminiGateway::new(config.gateway.clone(), registry.declarations())?;

    tracing::info!(
        model = gateway.model(),
        tools = ?registry.tool_names(),
        max_tool_rounds = config.engine.max_tool_rounds,
        has_api_key = config.gateway.api_key().is_some(),
        "engine configured"
    );

    Ok(OrchestrationEngine::with_config(
        Arc::new(gateway),
        registry,
        &config.engine,
    ))
}

/// Initialize the tracing subscriber, writing to `assistant.log` in the data directory.
///
/// The previous logs are shifted to `assistant.log.1` … `.3` first. `RUST_LOG`
/// overrides the default `voiceloop=info,warn` filter and
/// [`LOG_JSON_ENV`]`=1` switches to JSON lines. Returns the log file path.
pub fn init_tracing() -> std::io::Result<PathBuf> {
    init_tracing_in(&data_dir())
}

fn init_tracing_in(log_dir: &Path) -> std::io::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join("assistant.log");
    shift_logs(&log_path, KEPT_LOGS);

    // `File` is unbuffered, so every event reaches disk as it is written.
    let log_file = std::fs::File::create(&log_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("voiceloop=info,warn"));

    let json = std::env::var(LOG_JSON_ENV).is_ok_and(|v| v == "1");
    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_path.display(),
        json,
        pid = std::process::id(),
        "=== voiceloop starting ==="
    );

    Ok(log_path)
}

/// Rotated logs kept next to the live one.
const KEPT_LOGS: u32 = 3;

/// `assistant.log` for generation 0, `assistant.log.N` otherwise.
fn log_generation(live: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return live.to_path_buf();
    }
    let mut name = live.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Move every generation up by one, dropping whatever falls past `keep`.
fn shift_logs(live: &Path, keep: u32) {
    let _ = std::fs::remove_file(log_generation(live, keep));
    for n in (0..keep).rev() {
        let from = log_generation(live, n);
        if from.exists() {
            if let Err(e) = std::fs::rename(&from, log_generation(live, n + 1)) {
                eprintln!("could not rotate {}: {e}", from.display());
            }
        }
    }
}
