//! Model gateway — the `generateContent` HTTP client.
//!
//! Builds request payloads from conversation history, performs the call and
//! folds every outcome into a [`ModelResponse`]. No retries happen here; the
//! retry flag on `Error` is information for the caller.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client as HttpClient;

use crate::agent_core::conversation::build_contents;
use crate::agent_core::types::Message;
use crate::tools::types::ToolDeclaration;

use super::config::GatewayConfig;
use super::errors::GatewayError;
use super::parser::parse_generate_response;
use super::types::{
    Content, ContentRole, FunctionDeclaration, GenerateContentRequest, ModelResponse, Part,
    ToolSet,
};

// ─── ModelGateway ────────────────────────────────────────────────────────────

/// The engine's view of the remote model.
///
/// Implementations never fail with `Err`: every problem is reported as
/// [`ModelResponse::Error`].
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send the conversation so far. When `tools_enabled` is false no tool
    /// declarations are attached and a `FunctionCall` is never returned.
    async fn send(&self, history: &[Message], tools_enabled: bool) -> ModelResponse;

    /// Single-turn image question. Tools are always disabled.
    async fn send_with_image(&self, prompt: &str, image: &[u8]) -> ModelResponse;
}

// ─── GeminiGateway ───────────────────────────────────────────────────────────

/// HTTP implementation of [`ModelGateway`].
pub struct GeminiGateway {
    http: HttpClient,
    config: GatewayConfig,
    /// Advertised on tool-enabled requests. Fixed for the gateway's lifetime.
    declarations: Vec<FunctionDeclaration>,
}

impl GeminiGateway {
    /// Create a gateway. Does NOT check connectivity or the key — a missing
    /// key is reported on the first call.
    pub fn new(config: GatewayConfig, tools: &[ToolDeclaration]) -> Result<Self, GatewayError> {
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::ConfigError {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            declarations: tools.iter().map(FunctionDeclaration::from).collect(),
            config,
        })
    }

    /// The model name requests are sent to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Endpoint URL without the key query parameter (safe to log).
    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Build the request body for a history-based call.
    pub fn build_request(&self, history: &[Message], tools_enabled: bool) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: build_contents(history),
            tools: tools_enabled.then(|| {
                vec![ToolSet {
                    function_declarations: self.declarations.clone(),
                }]
            }),
        }
    }

    /// Build the request body for an image question.
    pub fn build_image_request(&self, prompt: &str, image: &[u8]) -> GenerateContentRequest {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        GenerateContentRequest {
            contents: vec![Content::new(
                ContentRole::User,
                vec![
                    Part::text(prompt),
                    Part::inline_data(self.config.image_mime_type.clone(), encoded),
                ],
            )],
            tools: None,
        }
    }

    /// POST the body and parse the reply.
    async fn execute(
        &self,
        api_key: &str,
        body: &GenerateContentRequest,
        tools_enabled: bool,
    ) -> Result<ModelResponse, GatewayError> {
        let url = self.endpoint();

        tracing::info!(
            url = %url,
            content_count = body.contents.len(),
            has_tools = body.tools.is_some(),
            tool_count = body
                .tools
                .as_ref()
                .map(|t| t.iter().map(|s| s.function_declarations.len()).sum::<usize>())
                .unwrap_or(0),
            "=== MODEL REQUEST ==="
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                body = %serde_json::to_string(body).unwrap_or_default(),
                "model request body"
            );
        }

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout {
                        duration_secs: self.config.request_timeout_secs,
                    }
                } else {
                    GatewayError::ConnectionFailed {
                        endpoint: url.clone(),
                        reason: e.without_url().to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "No error details".to_string());
            tracing::warn!(status = status.as_u16(), body = %body_text, "model API error response");
            return Err(GatewayError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response.text().await.map_err(|e| GatewayError::BodyRead {
            reason: e.without_url().to_string(),
        })?;
        tracing::debug!(body = %body_text, "model response body");

        parse_generate_response(&body_text, tools_enabled)
    }

    fn require_key(&self) -> Result<&str, GatewayError> {
        self.config.api_key().ok_or(GatewayError::CredentialsMissing)
    }

    async fn try_send(
        &self,
        history: &[Message],
        tools_enabled: bool,
    ) -> Result<ModelResponse, GatewayError> {
        let key = self.require_key()?;
        if history.is_empty() {
            return Err(GatewayError::EmptyHistory);
        }
        let body = self.build_request(history, tools_enabled);
        self.execute(key, &body, tools_enabled).await
    }

    async fn try_send_with_image(
        &self,
        prompt: &str,
        image: &[u8],
    ) -> Result<ModelResponse, GatewayError> {
        let key = self.require_key()?;
        let body = self.build_image_request(prompt, image);
        self.execute(key, &body, false).await
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn send(&self, history: &[Message], tools_enabled: bool) -> ModelResponse {
        self.try_send(history, tools_enabled)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "model call failed");
                e.into_response()
            })
    }

    async fn send_with_image(&self, prompt: &str, image: &[u8]) -> ModelResponse {
        self.try_send_with_image(prompt, image)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "image model call failed");
                e.into_response()
            })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
