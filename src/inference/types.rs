//! Wire types for the `generateContent` API and the gateway's response union.
//!
//! The request/response structs mirror the remote JSON exactly (camelCase
//! keys, optional parts). [`ModelResponse`] is what the rest of the crate sees.

use serde::{Deserialize, Serialize};

use crate::tools::types::ToolDeclaration;

// ─── Gateway Output ──────────────────────────────────────────────────────────

/// Result of one gateway call. Produced fresh per call, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// Plain answer, already trimmed.
    TextReply(String),
    /// The model wants a tool invoked.
    FunctionCall {
        name: String,
        arguments: serde_json::Value,
    },
    /// Anything that went wrong between building the request and parsing the reply.
    Error { message: String, retryable: bool },
}

// ─── Request Types ───────────────────────────────────────────────────────────

/// Request body for `POST …:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSet>>,
}

/// Who authored a content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
    Tool,
}

/// One conversation turn in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ContentRole>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: ContentRole, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role),
            parts,
        }
    }
}

/// A single part. Exactly one field is set on well-formed parts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponsePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn function_call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            function_call: Some(FunctionCallPart {
                name: name.into(),
                args,
            }),
            ..Self::default()
        }
    }

    /// Tool output keyed by the function name, result under `response.result`.
    pub fn function_response(name: impl Into<String>, result: &str) -> Self {
        Self {
            function_response: Some(FunctionResponsePart {
                name: name.into(),
                response: serde_json::json!({ "result": result }),
            }),
            ..Self::default()
        }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallPart {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponsePart {
    pub name: String,
    pub response: serde_json::Value,
}

/// Base64 payload (no line wrapping) plus its MIME type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// The `tools` array entry: a group of function declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSet {
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Function declaration as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl From<&ToolDeclaration> for FunctionDeclaration {
    fn from(decl: &ToolDeclaration) -> Self {
        let properties: serde_json::Map<String, serde_json::Value> = decl
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({ "type": p.kind.as_wire_str() }),
                )
            })
            .collect();
        let required: Vec<&str> = decl
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        Self {
            name: decl.name.clone(),
            description: decl.description.clone(),
            parameters: serde_json::json!({
                "type": "OBJECT",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// Response body of `generateContent`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
