//! Command executor — turns one named action into a sentence for the model.
//!
//! `CommandExecutor` is the boundary the registry dispatches through. The
//! local implementation validates arguments, asks a [`DeviceLauncher`] to do
//! the work and phrases every outcome, including failures, as a reply. It
//! never returns an error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveTime, Timelike};
use serde_json::Value;

use crate::inference::config::DeviceConfig;

use super::alarm::{parse_alarm_command, AlarmParse};
use super::launcher::{DeviceLauncher, LaunchError};
use super::registry::{CALL_CONTACT, OPEN_APP, SEARCH_WEB, SET_ALARM};

/// Label attached to every alarm the assistant creates.
pub const ALARM_LABEL: &str = "AI Assistant Alarm";

/// Executes one named action and returns a human-readable result.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, tool_name: &str, arguments: &Value) -> String;
}

type Clock = Box<dyn Fn() -> NaiveTime + Send + Sync>;

/// Executor backed by the configured device inventory and a launcher.
pub struct LocalCommandExecutor {
    device: DeviceConfig,
    launcher: Arc<dyn DeviceLauncher>,
    clock: Clock,
}

impl LocalCommandExecutor {
    pub fn new(device: DeviceConfig, launcher: Arc<dyn DeviceLauncher>) -> Self {
        Self {
            device,
            launcher,
            clock: Box::new(|| chrono::Local::now().time()),
        }
    }

    /// Replace the wall clock used for relative alarms.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveTime + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    async fn set_alarm(&self, command: &str) -> String {
        if command.is_empty() {
            return "I need a time to set the alarm.".into();
        }

        match parse_alarm_command(command, (self.clock)()) {
            AlarmParse::Relative { amount, unit, at } => {
                match self
                    .launcher
                    .set_alarm(at.hour(), at.minute(), ALARM_LABEL)
                    .await
                {
                    Ok(()) => format!("OK, alarm set for {amount} {unit} from now."),
                    Err(LaunchError::Unsupported { .. }) => unsupported("set alarms"),
                    Err(e) => {
                        tracing::warn!(error = %e, "relative alarm failed");
                        "Sorry, I couldn't set the relative alarm.".into()
                    }
                }
            }
            AlarmParse::InvalidRelative => "Sorry, I couldn't set the relative alarm.".into(),
            AlarmParse::Absolute {
                hour,
                minute,
                matched,
            } => match self.launcher.set_alarm(hour, minute, ALARM_LABEL).await {
                Ok(()) => format!("Alarm set for {matched}."),
                Err(LaunchError::Unsupported { .. }) => unsupported("set alarms"),
                Err(e) => {
                    tracing::warn!(error = %e, "alarm failed");
                    "Sorry, I couldn't set the alarm.".into()
                }
            },
            AlarmParse::NoTime => "Sorry, I couldn't understand the time.".into(),
        }
    }

    async fn open_app(&self, app_name: &str) -> String {
        if app_name.is_empty() {
            return "Which app would you like to open?".into();
        }

        let Some(label) = self.find_app(app_name) else {
            return format!("Sorry, I can't find the app {app_name}.");
        };

        match self.launcher.launch_app(label).await {
            Ok(()) => format!("Opening {label}."),
            Err(e) => {
                tracing::warn!(app = %label, error = %e, "app launch failed");
                "Sorry, there was an error opening that app.".into()
            }
        }
    }

    /// Exact (case-insensitive) label first, then containment.
    fn find_app(&self, app_name: &str) -> Option<&str> {
        let wanted = app_name.to_lowercase();
        self.device
            .apps
            .iter()
            .find(|label| label.to_lowercase() == wanted)
            .or_else(|| {
                self.device
                    .apps
                    .iter()
                    .find(|label| label.to_lowercase().contains(&wanted))
            })
            .map(String::as_str)
    }

    async fn call_contact(&self, contact_name: &str) -> String {
        if contact_name.is_empty() {
            return "Who would you like to call?".into();
        }

        let display = capitalize_first(contact_name);
        let wanted = contact_name.to_lowercase();
        let Some(contact) = self
            .device
            .contacts
            .iter()
            .find(|c| c.name.to_lowercase().contains(&wanted))
        else {
            return format!("Sorry, I couldn't find {display} in your contacts.");
        };

        match self.launcher.dial(&contact.number).await {
            Ok(()) => format!("Calling {display}..."),
            Err(LaunchError::PermissionDenied { .. }) => {
                "I need phone permission to make calls. Please grant it in settings.".into()
            }
            Err(LaunchError::Unsupported { .. }) => unsupported("make calls"),
            Err(e) => {
                tracing::warn!(error = %e, "dial failed");
                format!("Sorry, I couldn't call {display}.")
            }
        }
    }

    async fn search_web(&self, query: &str) -> String {
        if query.is_empty() {
            return "What would you like to search for?".into();
        }

        match self.launcher.web_search(query).await {
            Ok(()) => format!("Searching for {query}..."),
            Err(e) => {
                tracing::warn!(error = %e, "web search failed");
                "Sorry, I couldn't start the search.".into()
            }
        }
    }
}

#[async_trait]
impl CommandExecutor for LocalCommandExecutor {
    async fn execute(&self, tool_name: &str, arguments: &Value) -> String {
        match tool_name {
            SET_ALARM => self.set_alarm(&string_arg(arguments, "command")).await,
            OPEN_APP => self.open_app(&string_arg(arguments, "appName")).await,
            CALL_CONTACT => self.call_contact(&string_arg(arguments, "contactName")).await,
            SEARCH_WEB => self.search_web(&string_arg(arguments, "query")).await,
            other => format!("Unknown function: {other}"),
        }
    }
}

/// A trimmed string argument; absent or non-string values read as blank.
fn string_arg(arguments: &Value, key: &str) -> String {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn unsupported(what: &str) -> String {
    format!("Sorry, I can't {what} on this device.")
}
