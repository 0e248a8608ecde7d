//! Orchestration engine — one user turn from input to a single terminal message.
//!
//! Loop:
//! 1. **Gate** — decide whether tool declarations are offered for this turn
//! 2. **Ask** — send the history to the model gateway
//! 3. **Branch** — text ends the turn; a known tool is dispatched, its result
//!    appended and the model asked again; an unknown tool triggers one
//!    fallback request with only the latest user message and no tools
//!
//! Errors never leave the engine: every path ends in a [`TurnOutcome`].

use std::slice;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::inference::client::ModelGateway;
use crate::inference::config::EngineConfig;
use crate::inference::types::ModelResponse;
use crate::tools::registry::ToolRegistry;

use super::conversation::ConversationHistory;
use super::tool_gate::{KeywordGate, ToolGate};
use super::types::{TurnOutcome, TurnState};

/// Reply to blank input.
pub const BLANK_INPUT_REPLY: &str = "I didn't catch that. Could you say it again?";

/// Reply when the fallback has nothing to work from.
pub const FALLBACK_APOLOGY: &str = "I got confused. Could you please ask again?";

/// Reply when the model keeps asking for tools past the per-turn limit.
pub const TOO_MANY_TOOL_CALLS: &str = "Error: too many tool calls in one turn";

// ─── OrchestrationEngine ────────────────────────────────────────────────────

/// Owns the conversation and drives the request/dispatch loop.
pub struct OrchestrationEngine {
    gateway: Arc<dyn ModelGateway>,
    registry: ToolRegistry,
    gate: Box<dyn ToolGate>,
    history: ConversationHistory,
    max_tool_rounds: u32,
    state: TurnState,
}

/// Per-turn bookkeeping for logging and the outcome.
struct Turn {
    id: Uuid,
    started: Instant,
    gateway_calls: u32,
}

impl Turn {
    fn begin(kind: &'static str) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(turn_id = %id, kind, "turn started");
        Self {
            id,
            started: Instant::now(),
            gateway_calls: 0,
        }
    }
}

impl OrchestrationEngine {
    /// Engine with the keyword gate and the default round limit.
    pub fn new(gateway: Arc<dyn ModelGateway>, registry: ToolRegistry) -> Self {
        Self::with_config(gateway, registry, &EngineConfig::default())
    }

    /// Engine configured from the `engine` section.
    pub fn with_config(
        gateway: Arc<dyn ModelGateway>,
        registry: ToolRegistry,
        config: &EngineConfig,
    ) -> Self {
        let gate = match &config.tool_keywords {
            Some(keywords) => KeywordGate::from_keywords(keywords),
            None => KeywordGate::new(),
        };
        Self {
            gateway,
            registry,
            gate: Box::new(gate),
            history: ConversationHistory::new(),
            max_tool_rounds: config.max_tool_rounds.max(1),
            state: TurnState::Idle,
        }
    }

    /// Replace the tool gate.
    pub fn with_gate(mut self, gate: impl ToolGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Drop the current conversation and begin an empty one.
    pub fn start_new_conversation(&mut self) {
        tracing::info!(discarded = self.history.len(), "starting new conversation");
        self.history = ConversationHistory::new();
        self.state = TurnState::Idle;
    }

    /// Run one text turn.
    pub async fn process_user_input(&mut self, text: &str) -> TurnOutcome {
        let mut turn = Turn::begin("text");
        self.transition(TurnState::Idle);

        let text = text.trim();
        if text.is_empty() {
            return self.finish(&turn, TurnState::TextTerminal, BLANK_INPUT_REPLY.into());
        }

        self.history.push_user(text);
        let tools_enabled = self.gate.tools_enabled(text);
        tracing::info!(
            turn_id = %turn.id,
            tools_enabled,
            history_len = self.history.len(),
            "=== USER TURN ==="
        );

        self.transition(TurnState::AwaitingModelReply);
        let mut response = self.ask(&mut turn, tools_enabled).await;
        let mut rounds = 0u32;
        let mut fell_back = false;

        loop {
            match response {
                ModelResponse::TextReply(reply) => {
                    self.history.push_model_text(reply.as_str());
                    return self.finish(&turn, TurnState::TextTerminal, reply);
                }
                ModelResponse::Error { message, retryable } => {
                    tracing::warn!(turn_id = %turn.id, error = %message, retryable, "turn failed");
                    return self.finish(&turn, TurnState::ErrorTerminal, format!("Error: {message}"));
                }
                ModelResponse::FunctionCall { name, arguments } if self.registry.is_known(&name) => {
                    if rounds >= self.max_tool_rounds {
                        tracing::warn!(
                            turn_id = %turn.id,
                            tool = %name,
                            max_tool_rounds = self.max_tool_rounds,
                            "tool round limit reached"
                        );
                        return self.finish(
                            &turn,
                            TurnState::ErrorTerminal,
                            TOO_MANY_TOOL_CALLS.into(),
                        );
                    }
                    rounds += 1;

                    self.transition(TurnState::Dispatching);
                    let result = self.registry.dispatch(&name, &arguments).await;
                    self.history
                        .push_tool_exchange(&name, arguments, result.output);

                    self.transition(TurnState::AwaitingModelReply);
                    response = self.ask(&mut turn, true).await;
                }
                ModelResponse::FunctionCall { name, .. } => {
                    tracing::warn!(turn_id = %turn.id, tool = %name, "model requested unknown tool");
                    if fell_back {
                        return self.finish(&turn, TurnState::TextTerminal, FALLBACK_APOLOGY.into());
                    }
                    fell_back = true;
                    match self.fallback(&mut turn).await {
                        Some(next) => response = next,
                        None => {
                            return self.finish(
                                &turn,
                                TurnState::TextTerminal,
                                FALLBACK_APOLOGY.into(),
                            )
                        }
                    }
                }
            }
        }
    }

    /// Run one image question. No gate and no tool loop.
    pub async fn process_image(&mut self, prompt: &str, image: Vec<u8>) -> TurnOutcome {
        let mut turn = Turn::begin("image");
        self.transition(TurnState::Idle);

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return self.finish(&turn, TurnState::TextTerminal, BLANK_INPUT_REPLY.into());
        }

        tracing::info!(
            turn_id = %turn.id,
            image_bytes = image.len(),
            "=== IMAGE TURN ==="
        );
        self.history
            .push_user_with_image(format!("{prompt} (with image)"), image.clone());

        self.transition(TurnState::AwaitingModelReply);
        turn.gateway_calls += 1;
        match self.gateway.send_with_image(prompt, &image).await {
            ModelResponse::TextReply(reply) => {
                self.history.push_model_text(reply.as_str());
                self.finish(&turn, TurnState::TextTerminal, reply)
            }
            ModelResponse::Error { message, .. } => {
                self.finish(&turn, TurnState::ErrorTerminal, format!("Error: {message}"))
            }
            ModelResponse::FunctionCall { name, .. } => {
                tracing::warn!(turn_id = %turn.id, tool = %name, "function call on image path");
                self.finish(&turn, TurnState::TextTerminal, FALLBACK_APOLOGY.into())
            }
        }
    }

    /// Send the full history.
    async fn ask(&mut self, turn: &mut Turn, tools_enabled: bool) -> ModelResponse {
        turn.gateway_calls += 1;
        self.gateway
            .send(self.history.messages(), tools_enabled)
            .await
    }

    /// Re-ask with only the latest user message and tools disabled.
    ///
    /// `None` when there is no user message to retry with; no call is made.
    async fn fallback(&mut self, turn: &mut Turn) -> Option<ModelResponse> {
        self.transition(TurnState::FallbackRetry);
        let last_user = self.history.last_user_message()?.clone();

        turn.gateway_calls += 1;
        let response = self
            .gateway
            .send(slice::from_ref(&last_user), false)
            .await;
        self.transition(TurnState::AwaitingModelReply);
        Some(response)
    }

    fn transition(&mut self, next: TurnState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "turn state");
            self.state = next;
        }
    }

    fn finish(&mut self, turn: &Turn, state: TurnState, text: String) -> TurnOutcome {
        debug_assert!(state.is_terminal(), "turn finished in {state}");
        self.transition(state);
        tracing::info!(
            turn_id = %turn.id,
            state = %state,
            gateway_calls = turn.gateway_calls,
            history_len = self.history.len(),
            elapsed_ms = turn.started.elapsed().as_millis() as u64,
            "=== TURN COMPLETE ==="
        );
        TurnOutcome {
            text,
            state,
            gateway_calls: turn.gateway_calls,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::types::{Message, MessageContent, Role};
    use crate::tools::executor::CommandExecutor;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One recorded gateway call.
    #[derive(Debug, Clone)]
    struct SentRequest {
        history: Vec<Message>,
        tools_enabled: bool,
    }

    /// Replays scripted responses in order and records what it was sent.
    #[derive(Default)]
    struct ScriptedGateway {
        script: Mutex<VecDeque<ModelResponse>>,
        sent: Mutex<Vec<SentRequest>>,
        images: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedGateway {
        fn new(responses: Vec<ModelResponse>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(responses.into()),
                ..Self::default()
            })
        }

        fn next(&self) -> ModelResponse {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("gateway called more often than scripted")
        }

        fn sent(&self) -> Vec<SentRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn send(&self, history: &[Message], tools_enabled: bool) -> ModelResponse {
            self.sent.lock().unwrap().push(SentRequest {
                history: history.to_vec(),
                tools_enabled,
            });
            self.next()
        }

        async fn send_with_image(&self, prompt: &str, image: &[u8]) -> ModelResponse {
            self.images
                .lock()
                .unwrap()
                .push((prompt.to_string(), image.len()));
            self.next()
        }
    }

    /// Answers callContact like a phone that finds Mom.
    struct FakeExecutor;

    #[async_trait]
    impl CommandExecutor for FakeExecutor {
        async fn execute(&self, tool_name: &str, arguments: &Value) -> String {
            match tool_name {
                "callContact" => "Calling Mom...".into(),
                other => format!("{other} done with {arguments}"),
            }
        }
    }

    fn engine(gateway: Arc<ScriptedGateway>) -> OrchestrationEngine {
        OrchestrationEngine::new(gateway, ToolRegistry::builtin(Arc::new(FakeExecutor)))
    }

    fn text(s: &str) -> ModelResponse {
        ModelResponse::TextReply(s.into())
    }

    fn call(name: &str, args: Value) -> ModelResponse {
        ModelResponse::FunctionCall {
            name: name.into(),
            arguments: args,
        }
    }

    #[tokio::test]
    async fn test_plain_question_tools_disabled() {
        let gateway = ScriptedGateway::new(vec![text("Paris.")]);
        let mut engine = engine(gateway.clone());

        let outcome = engine
            .process_user_input("what's the capital of France")
            .await;

        assert_eq!(outcome.text, "Paris.");
        assert_eq!(outcome.state, TurnState::TextTerminal);
        assert_eq!(outcome.gateway_calls, 1);
        assert_eq!(engine.history().len(), 2);
        assert_eq!(engine.state(), TurnState::TextTerminal);

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].tools_enabled);
    }

    #[tokio::test]
    async fn test_known_tool_round_trip() {
        let gateway = ScriptedGateway::new(vec![
            call("callContact", json!({"contactName": "mom"})),
            text("Done, I've called Mom."),
        ]);
        let mut engine = engine(gateway.clone());

        let outcome = engine.process_user_input("call mom").await;

        assert_eq!(outcome.text, "Done, I've called Mom.");
        assert_eq!(outcome.gateway_calls, 2);

        let roles: Vec<Role> = engine.history().messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Model, Role::ToolResult, Role::Model]
        );
        assert_eq!(
            engine.history().messages()[2].content,
            MessageContent::ToolResult {
                name: "callContact".into(),
                result: "Calling Mom...".into(),
            }
        );

        let sent = gateway.sent();
        assert!(sent[0].tools_enabled);
        assert!(sent[1].tools_enabled);
        assert_eq!(sent[1].history.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_falls_back() {
        let gateway = ScriptedGateway::new(vec![
            call("bookFlight", json!({"to": "Lisbon"})),
            text("I can't book flights, but Lisbon is lovely."),
        ]);
        let mut engine = engine(gateway.clone());
        engine.history.push_user("earlier question");
        engine.history.push_model_text("earlier answer");

        let outcome = engine.process_user_input("find me a flight to Lisbon").await;

        assert_eq!(outcome.text, "I can't book flights, but Lisbon is lovely.");
        assert_eq!(outcome.state, TurnState::TextTerminal);
        assert_eq!(outcome.gateway_calls, 2);

        let sent = gateway.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].tools_enabled);
        assert!(!sent[1].tools_enabled);
        assert_eq!(sent[1].history, vec![Message::user("find me a flight to Lisbon")]);

        // The unknown call is never recorded.
        let roles: Vec<Role> = engine.history().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User, Role::Model]);
    }

    #[tokio::test]
    async fn test_fallback_without_user_message_apologizes() {
        let gateway = ScriptedGateway::new(vec![]);
        let mut engine = engine(gateway.clone());
        let mut turn = Turn::begin("test");

        assert!(engine.fallback(&mut turn).await.is_none());
        assert_eq!(turn.gateway_calls, 0);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_unknown_tool_apologizes() {
        let gateway = ScriptedGateway::new(vec![
            call("bookFlight", json!({})),
            call("bookHotel", json!({})),
        ]);
        let mut engine = engine(gateway.clone());

        let outcome = engine.process_user_input("search for hotels").await;

        assert_eq!(outcome.text, FALLBACK_APOLOGY);
        assert_eq!(outcome.gateway_calls, 2);
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_error_appends_nothing() {
        let gateway = ScriptedGateway::new(vec![ModelResponse::Error {
            message: "credentials missing".into(),
            retryable: false,
        }]);
        let mut engine = engine(gateway);

        let outcome = engine.process_user_input("hello").await;

        assert_eq!(outcome.text, "Error: credentials missing");
        assert!(outcome.is_error());
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.state(), TurnState::ErrorTerminal);
    }

    #[tokio::test]
    async fn test_blank_model_reply_ends_in_error() {
        let blank = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"   \n"}]}}]}"#;
        let response = crate::inference::parser::parse_generate_response(blank, false)
            .unwrap_or_else(|e| e.into_response());
        let gateway = ScriptedGateway::new(vec![response, text("Why did the chicken cross the road?")]);
        let mut engine = engine(gateway.clone());

        let outcome = engine.process_user_input("tell me a joke").await;
        assert!(outcome.is_error());
        assert!(outcome.text.starts_with("Error: "));
        assert_eq!(engine.history().len(), 1);

        engine.process_user_input("tell me a joke").await;
        let sent = gateway.sent();
        assert!(sent[1].history.iter().all(|m| m.role != Role::Model));
    }

    #[tokio::test]
    async fn test_blank_input_short_circuits() {
        let gateway = ScriptedGateway::new(vec![]);
        let mut engine = engine(gateway.clone());

        let outcome = engine.process_user_input("   \n").await;

        assert_eq!(outcome.text, BLANK_INPUT_REPLY);
        assert_eq!(outcome.gateway_calls, 0);
        assert!(engine.history().is_empty());
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        let config = EngineConfig {
            max_tool_rounds: 2,
            tool_keywords: None,
        };
        let gateway = ScriptedGateway::new(vec![
            call("searchWeb", json!({"query": "a"})),
            call("searchWeb", json!({"query": "b"})),
            call("searchWeb", json!({"query": "c"})),
        ]);
        let mut engine = OrchestrationEngine::with_config(
            gateway.clone(),
            ToolRegistry::builtin(Arc::new(FakeExecutor)),
            &config,
        );

        let outcome = engine.process_user_input("search everything").await;

        assert_eq!(outcome.text, TOO_MANY_TOOL_CALLS);
        assert_eq!(outcome.state, TurnState::ErrorTerminal);
        assert_eq!(outcome.gateway_calls, 3);
        // user + two call/result pairs; the third call is not recorded
        assert_eq!(engine.history().len(), 5);
    }

    #[tokio::test]
    async fn test_custom_gate_keywords() {
        let config = EngineConfig {
            max_tool_rounds: 5,
            tool_keywords: Some(vec!["play".into()]),
        };
        let gateway = ScriptedGateway::new(vec![text("ok"), text("ok")]);
        let mut engine = OrchestrationEngine::with_config(
            gateway.clone(),
            ToolRegistry::builtin(Arc::new(FakeExecutor)),
            &config,
        );

        engine.process_user_input("play jazz").await;
        engine.process_user_input("call mom").await;

        let sent = gateway.sent();
        assert!(sent[0].tools_enabled);
        assert!(!sent[1].tools_enabled);
    }

    #[tokio::test]
    async fn test_image_turn() {
        let gateway = ScriptedGateway::new(vec![text("A red bicycle.")]);
        let mut engine = engine(gateway.clone());

        let outcome = engine.process_image("what is this", vec![1, 2, 3, 4]).await;

        assert_eq!(outcome.text, "A red bicycle.");
        assert_eq!(outcome.gateway_calls, 1);
        let first = &engine.history().messages()[0];
        assert_eq!(first.text(), Some("what is this (with image)"));
        assert!(first.attached_image.is_some());
        assert_eq!(engine.history().len(), 2);
        assert_eq!(
            gateway.images.lock().unwrap().as_slice(),
            [("what is this".to_string(), 4)]
        );
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_start_new_conversation() {
        let gateway = ScriptedGateway::new(vec![text("hi")]);
        let mut engine = engine(gateway);
        engine.process_user_input("hello").await;
        assert_eq!(engine.history().len(), 2);

        engine.start_new_conversation();
        assert!(engine.history().is_empty());
        assert_eq!(engine.state(), TurnState::Idle);
    }
}
