use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde_json::{json, Map, Value};

use crate::engine::apply_edit::{Direction, EditOutcome, NotebookEdit};
use crate::engine::editor::NotebookEditor;
use crate::model::notebook::CellType;
use crate::server::ApiError;

type ApiResult = Result<Json<Value>, ApiError>;

pub fn router(editor: NotebookEditor) -> Router {
    Router::new()
        .route("/create_cell", post(create_cell))
        .route("/edit_cell", post(edit_cell))
        .route("/delete_cell", post(delete_cell))
        .route("/move_cell", post(move_cell))
        .route("/clear_all", post(clear_all))
        .with_state(Arc::new(editor))
}

/// The decoded request object plus typed field access.
struct Fields(Map<String, Value>);

impl Fields {
    /// Parse the body and require every key in `required`.
    fn parse(body: &[u8], required: &[&str]) -> Result<Self, ApiError> {
        let missing = || ApiError::bad_request(missing_message(required));
        let fields = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => return Err(missing()),
        };
        if required.iter().any(|key| !fields.contains_key(*key)) {
            return Err(missing());
        }
        Ok(Self(fields))
    }

    fn string(&self, key: &str) -> Result<String, ApiError> {
        match self.0.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(ApiError::bad_request(format!("{} must be a string", key))),
        }
    }

    fn integer(&self, key: &str) -> Result<i64, ApiError> {
        self.0
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| ApiError::bad_request(format!("{} must be an integer", key)))
    }

    fn optional_integer(&self, key: &str, default: i64) -> Result<i64, ApiError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(_) => self.integer(key),
        }
    }
}

fn missing_message(required: &[&str]) -> String {
    match required {
        [one] => format!("Missing {}", one),
        [first, last] => format!("Missing {} or {}", first, last),
        [rest @ .., last] => format!("Missing {}, or {}", rest.join(", "), last),
        [] => "Missing request body".to_string(),
    }
}

async fn run(editor: Arc<NotebookEditor>, name: String, edit: NotebookEdit) -> ApiResult {
    let outcome_name = name.clone();
    let outcome = tokio::task::spawn_blocking(move || editor.apply(&name, edit))
        .await
        .map_err(|err| ApiError::internal(err.to_string()))??;
    Ok(Json(outcome_body(&outcome, &outcome_name)))
}

fn outcome_body(outcome: &EditOutcome, name: &str) -> Value {
    let message = outcome.message(name);
    match outcome {
        EditOutcome::Created { total_cells }
        | EditOutcome::Edited { total_cells, .. }
        | EditOutcome::Deleted { total_cells, .. } => {
            json!({ "message": message, "total_cells": total_cells })
        }
        EditOutcome::Moved { to, .. } => json!({ "message": message, "new_position": to }),
        EditOutcome::Cleared => json!({ "message": message }),
    }
}

async fn create_cell(State(editor): State<Arc<NotebookEditor>>, body: Bytes) -> ApiResult {
    let fields = Fields::parse(&body, &["notebook_name", "cell_type", "content"])?;
    let name = fields.string("notebook_name")?;
    let cell_type = fields
        .string("cell_type")?
        .parse::<CellType>()
        .map_err(ApiError::bad_request)?;
    let content = fields.string("content")?;

    run(editor, name, NotebookEdit::CreateCell { cell_type, content }).await
}

async fn edit_cell(State(editor): State<Arc<NotebookEditor>>, body: Bytes) -> ApiResult {
    let fields = Fields::parse(&body, &["notebook_name", "cell_number", "content"])?;
    let name = fields.string("notebook_name")?;
    let index = fields.integer("cell_number")?;
    let content = fields.string("content")?;

    run(editor, name, NotebookEdit::EditCell { index, content }).await
}

async fn delete_cell(State(editor): State<Arc<NotebookEditor>>, body: Bytes) -> ApiResult {
    let fields = Fields::parse(&body, &["notebook_name", "cell_number"])?;
    let name = fields.string("notebook_name")?;
    let index = fields.integer("cell_number")?;

    run(editor, name, NotebookEdit::DeleteCell { index }).await
}

async fn move_cell(State(editor): State<Arc<NotebookEditor>>, body: Bytes) -> ApiResult {
    let fields = Fields::parse(&body, &["notebook_name", "cell_number", "direction"])?;
    let name = fields.string("notebook_name")?;
    let index = fields.integer("cell_number")?;
    let direction = fields.string("direction")?.parse::<Direction>()?;
    let places = fields.optional_integer("places", 1)?;

    run(
        editor,
        name,
        NotebookEdit::MoveCell {
            index,
            direction,
            places,
        },
    )
    .await
}

async fn clear_all(State(editor): State<Arc<NotebookEditor>>, body: Bytes) -> ApiResult {
    let fields = Fields::parse(&body, &["notebook_name"])?;
    let name = fields.string("notebook_name")?;

    run(editor, name, NotebookEdit::ClearAll).await
}
