//! Assistant configuration loading.
//!
//! Reads `config/assistant.yaml` and resolves environment variables. Every
//! field has a default, so a missing file is not an error: the defaults are
//! used with the API key taken from `GEMINI_API_KEY`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::errors::GatewayError;

/// Relative location of the config file under the project root.
const CONFIG_RELATIVE_PATH: &str = "config/assistant.yaml";

/// Environment variable holding the API key when no config file exists.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// ─── Public Types ────────────────────────────────────────────────────────────

/// Model gateway settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Blank and absent are equivalent: the gateway reports missing credentials.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// MIME type declared for images sent on the image path.
    #[serde(default = "default_image_mime_type")]
    pub image_mime_type: String,
}

impl GatewayConfig {
    /// The API key, if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            image_mime_type: default_image_mime_type(),
        }
    }
}

/// Orchestration engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Tool dispatches allowed in one turn before the turn is cut off.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Replaces the built-in gate keywords when set.
    #[serde(default)]
    pub tool_keywords: Option<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            tool_keywords: None,
        }
    }
}

/// A contact the local executor can dial.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ContactEntry {
    pub name: String,
    pub number: String,
}

/// What the local command executor knows about the device.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceConfig {
    /// Launchable application labels.
    #[serde(default)]
    pub apps: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
}

/// Top-level configuration (mirrors `config/assistant.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_image_mime_type() -> String {
    "image/jpeg".into()
}
fn default_max_tool_rounds() -> u32 {
    5
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Resolve the config path.
///
/// Checks `VOICELOOP_PROJECT_ROOT` first, then searches upward from `start`
/// for `config/assistant.yaml`.
pub fn find_config_path(start: &Path) -> Result<PathBuf, GatewayError> {
    if let Ok(root) = std::env::var("VOICELOOP_PROJECT_ROOT") {
        let candidate = PathBuf::from(&root).join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(GatewayError::ConfigError {
        reason: format!("could not find {CONFIG_RELATIVE_PATH}"),
    })
}

/// Load and parse a config file.
///
/// Performs environment-variable interpolation on `${VAR_NAME}` and
/// `${VAR_NAME:-default}` before parsing.
pub fn load_assistant_config(path: &Path) -> Result<AssistantConfig, GatewayError> {
    let raw = std::fs::read_to_string(path).map_err(|e| GatewayError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    parse_assistant_config(&raw)
}

/// Parse config text (after env interpolation).
pub fn parse_assistant_config(raw: &str) -> Result<AssistantConfig, GatewayError> {
    let interpolated = interpolate_env_vars(raw);

    // An empty file parses as YAML null; treat it as "all defaults".
    if interpolated.trim().is_empty() {
        return Ok(AssistantConfig::default());
    }

    let config: AssistantConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| GatewayError::ConfigError {
            reason: format!("failed to parse config: {e}"),
        })?;

    if config.engine.max_tool_rounds == 0 {
        return Err(GatewayError::ConfigError {
            reason: "engine.max_tool_rounds must be at least 1".into(),
        });
    }

    Ok(config)
}

/// Locate and load the config, falling back to defaults when no file exists.
///
/// The fallback takes its API key from `GEMINI_API_KEY`. A file that exists
/// but fails to parse is still an error.
pub fn load_or_default(start: &Path) -> Result<(AssistantConfig, Option<PathBuf>), GatewayError> {
    match find_config_path(start) {
        Ok(path) => {
            let config = load_assistant_config(&path)?;
            Ok((config, Some(path)))
        }
        Err(_) => {
            let mut config = AssistantConfig::default();
            config.gateway.api_key = std::env::var(API_KEY_ENV).ok();
            Ok((config, None))
        }
    }
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Expand `${VAR}` and `${VAR:-fallback}` references.
///
/// Unset variables expand to the fallback, or to nothing. An unterminated
/// `${` is copied through untouched.
fn interpolate_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let (name, fallback) = match after[..close].split_once(":-") {
            Some((name, fallback)) => (name, fallback),
            None => (&after[..close], ""),
        };
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(fallback),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
