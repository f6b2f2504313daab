use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::agent::Agent;
use crate::model::error::AgentError;
use crate::server::ApiError;

#[derive(Deserialize)]
struct ConnectRequest {
    server_url: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

pub fn router(agent: Agent) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/servers", get(servers))
        .route("/chat", post(chat))
        .with_state(Arc::new(agent))
}

fn parse<T: for<'de> Deserialize<'de>>(body: &[u8], expected: &str) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("Expected {}: {}", expected, err)))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "agent running" }))
}

async fn connect(State(agent): State<Arc<Agent>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let req: ConnectRequest = parse(&body, "{server_url}")?;
    agent.registry().connect(&req.server_url);

    Ok(Json(json!({
        "connected": req.server_url,
        "servers": agent.registry().servers(),
    })))
}

async fn disconnect(
    State(agent): State<Arc<Agent>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let req: ConnectRequest = parse(&body, "{server_url}")?;
    let removed = agent.registry().disconnect(&req.server_url);

    Ok(Json(json!({
        "disconnected": removed,
        "servers": agent.registry().servers(),
    })))
}

async fn servers(State(agent): State<Arc<Agent>>) -> Json<Value> {
    Json(json!({ "servers": agent.registry().servers() }))
}

async fn chat(State(agent): State<Arc<Agent>>, body: Bytes) -> Response {
    let req: ChatRequest = match parse(&body, "{message}") {
        Ok(req) => req,
        Err(err) => return err.into_response(),
    };

    match agent.chat(&req.message).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => agent_error_response(err),
    }
}

fn agent_error_response(err: AgentError) -> Response {
    match err {
        AgentError::NoServerConnected => ApiError::bad_request(err.to_string()).into_response(),
        AgentError::Transport(details) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "model call failed", "details": details })),
        )
            .into_response(),
        AgentError::Plan {
            source,
            raw_response,
        } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "invalid JSON from model",
                "reason": source.to_string(),
                "raw_response": raw_response,
            })),
        )
            .into_response(),
    }
}
