//! Gateway contract tests
//!
//! Verify the `generateContent` wire format against a mock server:
//! - Request shape (roles, parts, tool declarations, key query parameter)
//! - Response parsing into text / function call
//! - Error mapping and retry hints

use serde_json::json;
use voiceloop::agent_core::ConversationHistory;
use voiceloop::inference::{GatewayConfig, GeminiGateway, ModelGateway, ModelResponse};
use voiceloop::tools::builtin_declarations;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const ENDPOINT: &str = "/models/gemini-1.5-flash:generateContent";

fn gateway(server: &MockServer) -> GeminiGateway {
    let config = GatewayConfig {
        api_key: Some("test-key".into()),
        base_url: server.uri(),
        request_timeout_secs: 2,
        ..GatewayConfig::default()
    };
    GeminiGateway::new(config, &builtin_declarations()).unwrap()
}

fn text_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

fn user_history(text: &str) -> ConversationHistory {
    let mut history = ConversationHistory::new();
    history.push_user(text);
    history
}

// ────────────────────────────────────────────────────────────────────────────
// Request format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_text_request_without_tools() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "what's the capital of France"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("  Paris.  ")))
        .expect(1)
        .mount(&server)
        .await;

    let history = user_history("what's the capital of France");
    let response = gateway(&server).send(history.messages(), false).await;
    assert_eq!(response, ModelResponse::TextReply("Paris.".into()));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("tools").is_none());
}

#[tokio::test]
async fn test_tool_request_carries_declarations() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("ok")))
        .mount(&server)
        .await;

    let history = user_history("open maps");
    gateway(&server).send(history.messages(), true).await;

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let decls = body["tools"][0]["functionDeclarations"].as_array().unwrap();
    assert_eq!(decls.len(), 4);

    let open_app = decls.iter().find(|d| d["name"] == "openApp").unwrap();
    assert_eq!(open_app["description"], "Opens an application.");
    assert_eq!(
        open_app["parameters"],
        json!({
            "type": "OBJECT",
            "properties": {"appName": {"type": "STRING"}},
            "required": ["appName"]
        })
    );
}

#[tokio::test]
async fn test_tool_exchange_serialization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "call mom"}]},
                {"role": "model", "parts": [{"functionCall": {"name": "callContact", "args": {"contactName": "mom"}}}]},
                {"role": "tool", "parts": [{"functionResponse": {"name": "callContact", "response": {"result": "Calling Mom..."}}}]}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Done, I've called Mom.")))
        .expect(1)
        .mount(&server)
        .await;

    let mut history = user_history("call mom");
    history.push_tool_exchange("callContact", json!({"contactName": "mom"}), "Calling Mom...");

    let response = gateway(&server).send(history.messages(), true).await;
    assert_eq!(response, ModelResponse::TextReply("Done, I've called Mom.".into()));
}

#[tokio::test]
async fn test_image_request_inline_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": "what is this"},
                    {"inlineData": {"mimeType": "image/jpeg", "data": "/9j/"}}
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("A photo.")))
        .expect(1)
        .mount(&server)
        .await;

    let response = gateway(&server)
        .send_with_image("what is this", &[0xff, 0xd8, 0xff])
        .await;
    assert_eq!(response, ModelResponse::TextReply("A photo.".into()));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("tools").is_none());
}

// ────────────────────────────────────────────────────────────────────────────
// Response parsing
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_function_call_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "setAlarm", "args": {"command": "7 am"}}}
                ]}
            }]
        })))
        .mount(&server)
        .await;

    let history = user_history("set an alarm for 7 am");
    let response = gateway(&server).send(history.messages(), true).await;
    assert_eq!(
        response,
        ModelResponse::FunctionCall {
            name: "setAlarm".into(),
            arguments: json!({"command": "7 am"}),
        }
    );
}

#[tokio::test]
async fn test_function_call_without_tools_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [
                {"functionCall": {"name": "openApp", "args": {"appName": "Maps"}}}
            ]}}]
        })))
        .mount(&server)
        .await;

    let history = user_history("tell me about maps");
    match gateway(&server).send(history.messages(), false).await {
        ModelResponse::Error { retryable, .. } => assert!(!retryable),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Error mapping
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_error_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let history = user_history("hello");
    match gateway(&server).send(history.messages(), false).await {
        ModelResponse::Error { message, retryable } => {
            assert_eq!(message, "API Error 403: API key not valid");
            assert!(!retryable);
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_candidates_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let history = user_history("hello");
    match gateway(&server).send(history.messages(), false).await {
        ModelResponse::Error { message, retryable } => {
            assert_eq!(message, "No candidates received from API.");
            assert!(!retryable);
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let history = user_history("hello");
    assert!(matches!(
        gateway(&server).send(history.messages(), false).await,
        ModelResponse::Error { retryable: false, .. }
    ));
}

#[tokio::test]
async fn test_timeout_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_body("late"))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let history = user_history("hello");
    match gateway(&server).send(history.messages(), false).await {
        ModelResponse::Error { message, retryable } => {
            assert!(retryable);
            assert!(message.starts_with("Network error"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

/// Base URL of a local port nothing listens on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn test_connection_refused_is_retryable() {
    let config = GatewayConfig {
        api_key: Some("test-key".into()),
        base_url: closed_port_url(),
        ..GatewayConfig::default()
    };

    let gw = GeminiGateway::new(config, &[]).unwrap();
    let history = user_history("hello");
    match gw.send(history.messages(), false).await {
        ModelResponse::Error { message, retryable } => {
            assert!(retryable, "not retryable: {message}");
            assert!(message.starts_with("Network error"));
        }
        other => panic!("expected connection error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_key_never_in_error_message() {
    let config = GatewayConfig {
        api_key: Some("super-secret-key".into()),
        base_url: closed_port_url(),
        ..GatewayConfig::default()
    };

    let gw = GeminiGateway::new(config, &[]).unwrap();
    let history = user_history("hello");
    match gw.send(history.messages(), false).await {
        ModelResponse::Error { message, .. } => {
            assert!(!message.contains("super-secret-key"), "leaked key: {message}");
        }
        other => panic!("expected connection error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_key_sent_as_query_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(|req: &Request| {
            let has_key = req
                .url
                .query_pairs()
                .any(|(k, v)| k == "key" && v == "test-key");
            if has_key {
                ResponseTemplate::new(200).set_body_json(text_body("authorized"))
            } else {
                ResponseTemplate::new(401)
            }
        })
        .mount(&server)
        .await;

    let history = user_history("hello");
    assert_eq!(
        gateway(&server).send(history.messages(), false).await,
        ModelResponse::TextReply("authorized".into())
    );
}
