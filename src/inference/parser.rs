//! Response parsing for `generateContent`.
//!
//! Only the first part of the first candidate matters: a `functionCall` there
//! wins, otherwise its text is the answer.

use super::errors::GatewayError;
use super::types::{GenerateContentResponse, ModelResponse};

/// Parse a 2xx response body into a [`ModelResponse`].
///
/// `tools_enabled` is the flag the request was sent with. A function call on a
/// request that offered no tools is a contract violation and is reported as
/// [`GatewayError::UnexpectedFunctionCall`] rather than a `FunctionCall`.
pub fn parse_generate_response(
    body: &str,
    tools_enabled: bool,
) -> Result<ModelResponse, GatewayError> {
    let resp: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::MalformedResponse {
            reason: format!("failed to parse response: {e}"),
        })?;

    let candidate = resp
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .ok_or(GatewayError::EmptyCandidates)?;

    let part = candidate
        .content
        .as_ref()
        .and_then(|c| c.parts.first())
        .ok_or_else(|| GatewayError::MalformedResponse {
            reason: "candidate has no content parts".into(),
        })?;

    if let Some(call) = &part.function_call {
        if !tools_enabled {
            return Err(GatewayError::UnexpectedFunctionCall {
                name: call.name.clone(),
            });
        }
        // Calls without arguments come back with `args` absent.
        let arguments = if call.args.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            call.args.clone()
        };
        return Ok(ModelResponse::FunctionCall {
            name: call.name.clone(),
            arguments,
        });
    }

    let text = part
        .text
        .as_deref()
        .ok_or_else(|| GatewayError::MalformedResponse {
            reason: "first part carries neither text nor a function call".into(),
        })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(GatewayError::MalformedResponse {
            reason: "model returned an empty reply".into(),
        });
    }
    Ok(ModelResponse::TextReply(text.to_string()))
}
