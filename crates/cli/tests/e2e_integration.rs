//! End-to-end integration tests for cypherchat.
//!
//! These tests drive the full pipeline from question to NDJSON events: the
//! ReAct agent, the graph tools over a fake store, the session coordinator
//! and the HTTP gateway.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cypherchat_agent::{
    AskRequest, SessionCoordinator, StreamEvent, collect_events, initialize_agent,
};
use cypherchat_config::AppConfig;
use cypherchat_core::error::{GraphError, ProviderError};
use cypherchat_core::graph::{GraphStore, Record};
use cypherchat_core::message::{Message, ToolCallRecord};
use cypherchat_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use cypherchat_core::tool::RenderMode;
use cypherchat_gateway::{GatewayState, build_router};
use http_body_util::BodyExt;
use serde_json::{Map, Value, json};
use tokio::sync::Notify;
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

enum Step {
    Respond(ProviderResponse),
    Fail(ProviderError),
    Hang,
}

/// A mock provider that plays scripted steps in sequence.
struct ScriptedProvider {
    steps: Mutex<Vec<Step>>,
    call_count: Mutex<usize>,
    called: Notify,
}

impl ScriptedProvider {
    fn new(mut steps: Vec<Step>) -> Self {
        steps.reverse();
        Self {
            steps: Mutex::new(steps),
            call_count: Mutex::new(0),
            called: Notify::new(),
        }
    }

    fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Resolves once the provider has been called at least once more.
    async fn wait_for_call(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.called.notified())
            .await
            .expect("provider was never called");
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let step = {
            *self.call_count.lock().unwrap() += 1;
            self.steps
                .lock()
                .unwrap()
                .pop()
                .expect("ScriptedProvider exhausted")
        };
        self.called.notify_one();
        match step {
            Step::Respond(response) => Ok(response),
            Step::Fail(error) => Err(error),
            Step::Hang => std::future::pending().await,
        }
    }
}

fn response(message: Message) -> ProviderResponse {
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn text(answer: &str) -> Step {
    Step::Respond(response(Message::ai(answer)))
}

fn tool_call(name: &str, args: Value) -> Step {
    Step::Respond(response(Message::ai_with_tool_calls(
        Value::Null,
        vec![ToolCallRecord::new(format!("call_{name}"), name, args)],
    )))
}

// ── Fake graph ───────────────────────────────────────────────────────────

/// Answers every query with the same records.
struct FakeGraph {
    records: Vec<Record>,
}

impl FakeGraph {
    fn empty() -> Self {
        Self { records: vec![] }
    }

    fn with(records: Vec<Value>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| r.as_object().cloned().unwrap())
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl GraphStore for FakeGraph {
    async fn run_read(
        &self,
        _query: &str,
        _params: Map<String, Value>,
    ) -> Result<Vec<Record>, GraphError> {
        Ok(self.records.clone())
    }
}

async fn coordinator(provider: Arc<ScriptedProvider>, graph: FakeGraph) -> SessionCoordinator {
    let init = initialize_agent(provider, Arc::new(graph), &AppConfig::default()).await;
    SessionCoordinator::new(init.agent, "1")
}

fn kinds(events: &[StreamEvent]) -> Vec<&'static str> {
    events.iter().map(StreamEvent::event_type).collect()
}

// ── E2E: question to events ─────────────────────────────────────────────

#[tokio::test]
async fn e2e_name_search_without_results() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call("search_on_name", json!({"name": "Foo"})),
        text("No results found."),
    ]));
    let coordinator = coordinator(provider.clone(), FakeGraph::empty()).await;

    let rx = coordinator.ask(AskRequest::new("Who is Foo?")).await.unwrap();
    let events = collect_events(rx).await;

    assert_eq!(
        kinds(&events),
        ["thinking", "tool_start", "tool_end", "answer", "final"]
    );
    match &events[1] {
        StreamEvent::ToolStart {
            tool_name,
            call_id,
            message,
            args,
        } => {
            assert_eq!(tool_name, "search_on_name");
            assert_eq!(call_id.as_deref(), Some("call_search_on_name"));
            assert_eq!(message, "I am using tool search_on_name to name=Foo.");
            assert_eq!(args.get("name"), Some(&json!("Foo")));
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[2] {
        StreamEvent::ToolEnd { success, error, .. } => {
            assert!(success);
            assert!(error.is_none());
        }
        other => panic!("unexpected event {other:?}"),
    }
    match events.last().unwrap() {
        StreamEvent::Final { answer } => {
            assert_eq!(answer.answer, "No results found.");
            assert_eq!(answer.tools_used.len(), 1);
            assert!(answer.tools_used[0].success);
            assert_eq!(answer.tools_used[0].description, "Called search_on_name tool");
            assert_eq!(answer.renderables.len(), 1);
            assert_eq!(answer.renderables[0]["content_type"], "table");
            assert_eq!(answer.reasoning_steps[0], "Thinking…");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn e2e_write_query_reports_tool_failure() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call("read_neo4j_cypher", json!({"query": "MATCH (n) DETACH DELETE n"})),
        text("I can only run read queries."),
    ]));
    let coordinator = coordinator(provider, FakeGraph::empty()).await;

    let events = collect_events(coordinator.ask(AskRequest::new("Delete everything")).await.unwrap()).await;

    assert_eq!(
        kinds(&events),
        ["thinking", "tool_start", "tool_end", "answer", "final"]
    );
    match &events[2] {
        StreamEvent::ToolEnd {
            success,
            error,
            message,
            ..
        } => {
            assert!(!success);
            assert!(error.as_deref().unwrap().starts_with("Error: "));
            assert!(message.starts_with("read_neo4j_cypher reported an error: "));
        }
        other => panic!("unexpected event {other:?}"),
    }
    match events.last().unwrap() {
        StreamEvent::Final { answer } => assert!(!answer.tools_used[0].success),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn e2e_provider_failure_ends_with_single_error() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call("get_neo4j_schema", json!({})),
        Step::Fail(ProviderError::Network("connection reset".into())),
    ]));
    let coordinator = coordinator(provider, FakeGraph::empty()).await;

    let events = collect_events(coordinator.ask(AskRequest::new("Schema?")).await.unwrap()).await;

    assert_eq!(kinds(&events), ["thinking", "tool_start", "tool_end", "error"]);
    let terminal = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminal, 1);
    match events.last().unwrap() {
        StreamEvent::Error { message } => assert!(message.contains("connection reset")),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn e2e_disconnect_releases_conversation() {
    let provider = Arc::new(ScriptedProvider::new(vec![Step::Hang, text("Second answer")]));
    let coordinator = coordinator(provider.clone(), FakeGraph::empty()).await;

    let mut first = coordinator.ask(AskRequest::new("first")).await.unwrap();
    assert!(matches!(first.recv().await, Some(StreamEvent::Thinking { .. })));
    provider.wait_for_call().await;
    drop(first);

    let second = coordinator.ask(AskRequest::new("second")).await.unwrap();
    let events = tokio::time::timeout(Duration::from_secs(5), collect_events(second))
        .await
        .expect("conversation lock was not released");

    match events.last().unwrap() {
        StreamEvent::Final { answer } => assert_eq!(answer.answer, "Second answer"),
        other => panic!("unexpected event {other:?}"),
    }
    let history = coordinator.history("1").await.unwrap();
    let questions: Vec<_> = history
        .iter()
        .filter(|m| m.is_human())
        .map(|m| m.content().clone())
        .collect();
    assert_eq!(questions, [json!("first"), json!("second")]);
}

#[tokio::test]
async fn e2e_conversations_are_isolated() {
    let provider = Arc::new(ScriptedProvider::new(vec![Step::Hang, text("Answer for b")]));
    let coordinator = coordinator(provider.clone(), FakeGraph::empty()).await;

    let mut stuck = coordinator
        .ask(AskRequest::new("question a").with_conversation("a"))
        .await
        .unwrap();
    assert!(matches!(stuck.recv().await, Some(StreamEvent::Thinking { .. })));
    provider.wait_for_call().await;

    let other = coordinator
        .ask(AskRequest::new("question b").with_conversation("b"))
        .await
        .unwrap();
    let events = tokio::time::timeout(Duration::from_secs(5), collect_events(other))
        .await
        .expect("conversation b was blocked by conversation a");
    assert_eq!(kinds(&events).last(), Some(&"final"));

    let history = coordinator.history("b").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content(), &json!("question b"));
    drop(stuck);
}

// ── E2E: HTTP gateway ───────────────────────────────────────────────────

async fn post_ask(state: Arc<GatewayState>, body: Value) -> (StatusCode, Vec<Value>) {
    let req = Request::builder()
        .method("POST")
        .uri("/ask")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = build_router(state).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let events = std::str::from_utf8(&bytes)
        .unwrap()
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    (status, events)
}

#[tokio::test]
async fn e2e_gateway_streams_html_renderables() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call("search_on_name", json!({"name": "Harbour"})),
        text("Foo Harbour is a project."),
    ]));
    let graph = FakeGraph::with(vec![json!({"labels": ["Project"], "name": "Foo Harbour"})]);
    let state = Arc::new(GatewayState {
        coordinator: Arc::new(coordinator(provider, graph).await),
        schema_text: None,
        schema_error: None,
    });

    let (status, events) = post_ask(
        state,
        json!({"question": "Which harbour?", "responseMode": RenderMode::Html}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let types: Vec<_> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["thinking", "tool_start", "tool_end", "answer", "final"]);
    assert_eq!(events[1]["call_id"], "call_search_on_name");
    assert_eq!(events[2]["success"], true);
    assert!(
        events[2]["message"]
            .as_str()
            .unwrap()
            .starts_with("I have found ")
    );

    let answer = &events[4]["answer"];
    assert_eq!(answer["answer"], "Foo Harbour is a project.");
    assert_eq!(answer["renderables"][0]["content_type"], "html");
    assert!(
        answer["renderables"][0]["html"]
            .as_str()
            .unwrap()
            .contains("Foo Harbour")
    );
    assert_eq!(answer["tools_used"][0]["input_args"], json!({"name": "Harbour"}));
}

#[tokio::test]
async fn e2e_gateway_rejects_blank_question() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let state = Arc::new(GatewayState {
        coordinator: Arc::new(coordinator(provider.clone(), FakeGraph::empty()).await),
        schema_text: None,
        schema_error: None,
    });

    let req = Request::builder()
        .method("POST")
        .uri("/ask")
        .header("content-type", "application/json")
        .body(Body::from(json!({"question": "   "}).to_string()))
        .unwrap();
    let response = build_router(state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(provider.calls(), 0);
}
