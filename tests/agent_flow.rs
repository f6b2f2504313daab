mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing, Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use notebook_agent::config::{LlmBackend, Settings};
use notebook_agent::engine::agent::Agent;
use notebook_agent::engine::editor::NotebookEditor;
use notebook_agent::engine::executor::PlanExecutor;
use notebook_agent::engine::registry::ServerRegistry;
use notebook_agent::engine::store::{NotebookStore, StoreOptions};
use notebook_agent::model::action::{Action, ActionOutcome, Plan};
use notebook_agent::model::notebook::Notebook;
use notebook_agent::server::{agent_api, notebook_api};

/// Canned model backend answering both supported protocols.
#[derive(Clone)]
struct StubModel {
    reply: Arc<String>,
    calls: Arc<AtomicUsize>,
}

async fn ollama(State(stub): State<StubModel>, Json(req): Json<Value>) -> Json<Value> {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    assert_eq!(req["stream"], false);
    assert!(req["prompt"].as_str().unwrap().contains("User request:"));
    Json(json!({ "response": stub.reply.as_str() }))
}

async fn chat_completions(State(stub): State<StubModel>) -> Json<Value> {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "choices": [{ "message": { "content": stub.reply.as_str() } }] }))
}

async fn start_model(reply: &str) -> (String, Arc<AtomicUsize>) {
    let stub = StubModel {
        reply: Arc::new(reply.to_string()),
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let calls = stub.calls.clone();
    let app = Router::new()
        .route("/api/generate", routing::post(ollama))
        .route("/v1/chat/completions", routing::post(chat_completions))
        .with_state(stub);
    (common::spawn(app).await, calls)
}

async fn start_agent(llm_url: String, backend: LlmBackend) -> String {
    start_agent_with_timeout(llm_url, backend, 5).await
}

async fn start_agent_with_timeout(llm_url: String, backend: LlmBackend, secs: u64) -> String {
    let mut settings = Settings::default();
    settings.llm.url = llm_url;
    settings.llm.backend = backend;
    settings.llm.timeout_secs = secs;
    settings.action_timeout_secs = 5;
    let agent = Agent::from_settings(&settings, Arc::new(ServerRegistry::new())).unwrap();
    common::spawn(agent_api::router(agent)).await
}

async fn start_notebooks(dir: &std::path::Path) -> String {
    let store = NotebookStore::new(dir, StoreOptions::default());
    common::spawn(notebook_api::router(NotebookEditor::new(store))).await
}

async fn post(base: &str, endpoint: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}{endpoint}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

const TWO_CELL_PLAN: &str = r##"Here is the plan:
```json
{
  "actions": [
    {"endpoint": "/create_cell", "method": "POST",
     "payload": {"notebook_name": "lab.ipynb", "cell_type": "markdown", "content": "# Analysis"}},
    {"endpoint": "/clear_all", "method": "POST", "payload": {"notebook_name": "lab.ipynb"}},
    {"endpoint": "/create_cell", "method": "POST",
     "payload": {"notebook_name": "lab.ipynb", "cell_type": "code"}}
  ]
}
```"##;

#[tokio::test]
async fn health_and_connect() {
    let base = start_agent(common::dead_url().await, LlmBackend::Ollama).await;

    let resp: Value = reqwest::get(format!("{base}/")).await.unwrap().json().await.unwrap();
    assert_eq!(resp, json!({"status": "agent running"}));

    post(&base, "/connect", json!({"server_url": "http://a:5001"})).await;
    post(&base, "/connect", json!({"server_url": "http://b:5001"})).await;
    let (status, body) = post(&base, "/connect", json!({"server_url": "http://a:5001"})).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"connected": "http://a:5001", "servers": ["http://a:5001", "http://b:5001"]})
    );

    let (_, body) = post(&base, "/disconnect", json!({"server_url": "http://a:5001"})).await;
    assert_eq!(body, json!({"disconnected": true, "servers": ["http://b:5001"]}));

    let (status, _) = post(&base, "/connect", json!({"url": "http://a:5001"})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn chat_without_servers_skips_the_model() {
    let (model, calls) = start_model(TWO_CELL_PLAN).await;
    let base = start_agent(format!("{model}/api/generate"), LlmBackend::Ollama).await;

    let (status, body) = post(&base, "/chat", json!({"message": "add a title"})).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "No notebook servers connected");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chat_executes_only_allowed_actions_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let notebooks = start_notebooks(dir.path()).await;
    let (model, calls) = start_model(TWO_CELL_PLAN).await;
    let base = start_agent(format!("{model}/api/generate"), LlmBackend::Ollama).await;
    post(&base, "/connect", json!({"server_url": notebooks})).await;

    let (status, body) = post(&base, "/chat", json!({"message": "start an analysis notebook"})).await;

    assert_eq!(status, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let actions = body["plan"]["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[1]["payload"]["content"], "# Untitled");

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["status_code"], 200);
    assert_eq!(results[0]["response_body"]["total_cells"], 1);
    assert_eq!(results[1]["response_body"]["total_cells"], 2);

    let nb = Notebook::from_slice(&std::fs::read(dir.path().join("lab.ipynb")).unwrap()).unwrap();
    let cells: Vec<_> = nb.cells.iter().map(|c| (c.kind(), c.source())).collect();
    assert_eq!(cells, vec![("markdown", "# Analysis"), ("code", "# Untitled")]);
}

#[tokio::test]
async fn chat_completions_backend_is_supported() {
    let dir = tempfile::tempdir().unwrap();
    let notebooks = start_notebooks(dir.path()).await;
    let (model, calls) = start_model(TWO_CELL_PLAN).await;
    let base = start_agent(format!("{model}/v1/chat/completions"), LlmBackend::OpenAi).await;
    post(&base, "/connect", json!({"server_url": notebooks})).await;

    let (status, body) = post(&base, "/chat", json!({"message": "go"})).await;

    assert_eq!(status, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unusable_model_output_is_reported_with_raw_text() {
    let (model, _) = start_model(r#"{"actions": [{"endpoint": "/delete_cell"}]}"#).await;
    let base = start_agent(format!("{model}/api/generate"), LlmBackend::Ollama).await;
    post(&base, "/connect", json!({"server_url": "http://127.0.0.1:9"})).await;

    let (status, body) = post(&base, "/chat", json!({"message": "delete everything"})).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "invalid JSON from model");
    assert_eq!(body["reason"], "No valid actions found");
    assert_eq!(body["raw_response"], r#"{"actions": [{"endpoint": "/delete_cell"}]}"#);
}

#[tokio::test]
async fn model_transport_failure_is_reported() {
    let base = start_agent(common::dead_url().await, LlmBackend::Ollama).await;
    post(&base, "/connect", json!({"server_url": "http://127.0.0.1:9"})).await;

    let (status, body) = post(&base, "/chat", json!({"message": "hi"})).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "model call failed");
    assert!(body["details"].is_string());
}

async fn slow_generate() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "response": TWO_CELL_PLAN }))
}

#[tokio::test]
async fn slow_model_is_reported_as_model_failure() {
    let model = common::spawn(Router::new().route("/api/generate", routing::post(slow_generate))).await;
    let base =
        start_agent_with_timeout(format!("{model}/api/generate"), LlmBackend::Ollama, 1).await;
    post(&base, "/connect", json!({"server_url": "http://127.0.0.1:9"})).await;

    let (status, body) = post(&base, "/chat", json!({"message": "hi"})).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "model call failed");
    assert!(body["details"].is_string());
}

async fn slow_create_cell(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "message": "late", "total_cells": 1 }))
}

#[tokio::test]
async fn executor_times_out_each_action_and_keeps_going() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/create_cell", routing::post(slow_create_cell))
        .with_state(hits.clone());
    let notebooks = common::spawn(app).await;
    let executor = PlanExecutor::new(Duration::from_millis(300)).unwrap();

    let action = Action {
        endpoint: "/create_cell".to_string(),
        method: "POST".to_string(),
        payload: json!({"notebook_name": "t.ipynb", "cell_type": "code", "content": "x"})
            .as_object()
            .unwrap()
            .clone(),
    };
    let plan = Plan {
        actions: vec![action.clone(), action],
    };

    let results = executor.execute(&plan, &notebooks).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(ActionOutcome::is_failure));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn executor_records_failures_and_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let notebooks = start_notebooks(dir.path()).await;
    let dead = common::dead_url().await;
    let executor = PlanExecutor::new(Duration::from_secs(5)).unwrap();

    let action = |cell_type: &str| Action {
        endpoint: "/create_cell".to_string(),
        method: "POST".to_string(),
        payload: json!({"notebook_name": "e.ipynb", "cell_type": cell_type, "content": "x"})
            .as_object()
            .unwrap()
            .clone(),
    };
    let plan = Plan {
        actions: vec![action("bogus"), action("code")],
    };

    let results = executor.execute(&plan, &notebooks).await;
    assert_eq!(results.len(), 2);
    match &results[0] {
        ActionOutcome::Completed { status_code, .. } => assert_eq!(*status_code, 400),
        other => panic!("unexpected {other:?}"),
    }
    match &results[1] {
        ActionOutcome::Completed {
            status_code,
            response_body,
            ..
        } => {
            assert_eq!(*status_code, 200);
            assert_eq!(response_body["total_cells"], 1);
        }
        other => panic!("unexpected {other:?}"),
    }

    let results = executor.execute(&plan, &dead).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(ActionOutcome::is_failure));
    assert!(results.iter().all(|r| r.endpoint() == "/create_cell"));
}
