//! Tool registry — the fixed set of tools the model may call.
//!
//! Provides:
//! - The declarations advertised on tool-enabled requests
//! - Membership checks, so the engine can route unknown names to the fallback
//! - Dispatch of a known call to the command executor

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use super::executor::CommandExecutor;
use super::types::{ParameterSpec, ToolDeclaration, ToolInvocationResult};

pub const SET_ALARM: &str = "setAlarm";
pub const OPEN_APP: &str = "openApp";
pub const CALL_CONTACT: &str = "callContact";
pub const SEARCH_WEB: &str = "searchWeb";

/// The four built-in device tools.
pub fn builtin_declarations() -> Vec<ToolDeclaration> {
    let tool = |name: &str, description: &str, param: &str| ToolDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters: vec![ParameterSpec::required_string(param)],
    };

    vec![
        tool(SET_ALARM, "Sets an alarm.", "command"),
        tool(OPEN_APP, "Opens an application.", "appName"),
        tool(CALL_CONTACT, "Initiates a phone call.", "contactName"),
        tool(SEARCH_WEB, "Performs a web search.", "query"),
    ]
}

// ─── ToolRegistry ────────────────────────────────────────────────────────────

/// Name → capability mapping plus the declared schemas.
#[derive(Clone)]
pub struct ToolRegistry {
    declarations: Vec<ToolDeclaration>,
    executor: Arc<dyn CommandExecutor>,
}

impl ToolRegistry {
    pub fn new(declarations: Vec<ToolDeclaration>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            declarations,
            executor,
        }
    }

    /// Registry with the built-in tools.
    pub fn builtin(executor: Arc<dyn CommandExecutor>) -> Self {
        Self::new(builtin_declarations(), executor)
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    /// Whether `name` is a registered tool.
    pub fn is_known(&self, name: &str) -> bool {
        self.declarations.iter().any(|d| d.name == name)
    }

    /// Return all registered tool names, in declaration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Forward a call to the executor.
    ///
    /// Unknown names return a failed result without touching the executor.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> ToolInvocationResult {
        let start = Instant::now();

        if !self.is_known(name) {
            tracing::warn!(tool = %name, "dispatch of unregistered tool");
            return ToolInvocationResult {
                tool_name: name.to_string(),
                output: format!("Unknown function: {name}"),
                success: false,
                execution_time_ms: 0,
            };
        }

        let output = self.executor.execute(name, arguments).await;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            tool = %name,
            success = true,
            execution_time_ms,
            "tool dispatched"
        );

        ToolInvocationResult {
            tool_name: name.to_string(),
            output,
            success: true,
            execution_time_ms,
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
