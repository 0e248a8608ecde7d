//! Device launcher — the OS side of the local command executor.
//!
//! The executor decides *what* to do and phrases the reply; a launcher only
//! performs the action. `ShellLauncher` drives the platform opener on a
//! desktop host and reports alarms and dialing as unsupported.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

/// Why a device action did not happen.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// The OS refused (e.g. call permission not granted).
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// The host has no way to perform this action.
    #[error("'{action}' is not supported on this device")]
    Unsupported { action: String },

    /// The action was attempted and failed.
    #[error("launch failed: {reason}")]
    Failed { reason: String },
}

/// Performs device actions on behalf of the local command executor.
#[async_trait]
pub trait DeviceLauncher: Send + Sync {
    async fn set_alarm(&self, hour: u32, minute: u32, label: &str) -> Result<(), LaunchError>;

    async fn launch_app(&self, label: &str) -> Result<(), LaunchError>;

    async fn dial(&self, number: &str) -> Result<(), LaunchError>;

    async fn web_search(&self, query: &str) -> Result<(), LaunchError>;
}

/// Search engine used for `web_search`.
const SEARCH_URL: &str = "https://www.google.com/search";

/// Launcher backed by the platform's command-line openers.
pub struct ShellLauncher {
    /// `open` on macOS, `xdg-open` elsewhere.
    opener: String,
}

impl ShellLauncher {
    pub fn new() -> Self {
        let opener = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Self {
            opener: opener.to_string(),
        }
    }

    /// Build the search URL with the query percent-encoded.
    pub fn search_url(query: &str) -> Result<reqwest::Url, LaunchError> {
        reqwest::Url::parse_with_params(SEARCH_URL, &[("q", query)]).map_err(|e| {
            LaunchError::Failed {
                reason: format!("invalid search URL: {e}"),
            }
        })
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<(), LaunchError> {
        tracing::debug!(program, ?args, "launching");
        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|e| LaunchError::Failed {
                reason: format!("failed to spawn {program}: {e}"),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(LaunchError::Failed {
                reason: format!("{program} exited with {status}"),
            })
        }
    }
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceLauncher for ShellLauncher {
    async fn set_alarm(&self, _hour: u32, _minute: u32, _label: &str) -> Result<(), LaunchError> {
        Err(LaunchError::Unsupported {
            action: "setAlarm".into(),
        })
    }

    async fn launch_app(&self, label: &str) -> Result<(), LaunchError> {
        if cfg!(target_os = "macos") {
            self.run(&self.opener, &["-a", label]).await
        } else {
            self.run("gtk-launch", &[label]).await
        }
    }

    async fn dial(&self, _number: &str) -> Result<(), LaunchError> {
        Err(LaunchError::Unsupported {
            action: "callContact".into(),
        })
    }

    async fn web_search(&self, query: &str) -> Result<(), LaunchError> {
        let url = Self::search_url(query)?;
        self.run(&self.opener, &[url.as_str()]).await
    }
}
