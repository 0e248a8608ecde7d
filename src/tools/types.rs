//! Tool declaration and invocation types.

use serde::{Deserialize, Serialize};

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    /// The upper-case type name the generation API expects.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            ParamType::String => "STRING",
            ParamType::Number => "NUMBER",
            ParamType::Boolean => "BOOLEAN",
        }
    }
}

/// One parameter in a tool's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamType,
    pub required: bool,
}

impl ParameterSpec {
    /// A required string parameter — the shape every built-in tool uses.
    pub fn required_string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamType::String,
            required: true,
        }
    }
}

/// Static description of a callable tool. Loaded at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

/// Outcome of dispatching one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocationResult {
    pub tool_name: String,
    /// Human-readable sentence fed back to the model.
    pub output: String,
    pub success: bool,
    pub execution_time_ms: u64,
}
