pub mod agent_api;
pub mod notebook_api;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use crate::model::error::NotebookError;

/// `{error}` body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Logged here; the details still go back to the caller.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("Internal failure: {}", message);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl From<NotebookError> for ApiError {
    fn from(err: NotebookError) -> Self {
        if err.is_user_error() {
            ApiError::bad_request(err.to_string())
        } else {
            ApiError::internal(format!("{:#}", err))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Bind `addr` and serve `app` until the process stops.
pub async fn serve(app: Router, addr: &str, label: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {label} on {addr}"))?;
    let local_addr = listener.local_addr()?;
    log::info!("Serving {} on http://{}", label, local_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
