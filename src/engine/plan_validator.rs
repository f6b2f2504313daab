use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::model::action::{Action, Plan};
use crate::model::error::PlanError;

/// Endpoints a model-produced plan may call. Membership is exact string equality.
pub const ALLOWED_ENDPOINTS: &[&str] = &["/create_cell"];

/// Pulls a JSON object out of free-form model text.
pub trait JsonExtractor: Send + Sync {
    fn extract(&self, raw: &str) -> Result<Map<String, Value>, PlanError>;
}

/// Strips code fences, then parses the span from the first `{` to the last `}`.
///
/// Assumes the model emits at most one relevant object; a stray `}` in trailing
/// prose widens the span and makes the parse fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceSpanExtractor;

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)```json|```").expect("static fence pattern"))
}

impl JsonExtractor for BraceSpanExtractor {
    fn extract(&self, raw: &str) -> Result<Map<String, Value>, PlanError> {
        let text = fence_pattern().replace_all(raw, "");
        let text = text.trim();

        let span = match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => &text[start..=end],
            _ => {
                return Err(PlanError::MalformedResponse(
                    "No JSON object found".to_string(),
                ))
            }
        };

        match serde_json::from_str::<Value>(span) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(_) => Err(PlanError::MalformedResponse(
                "JSON value is not an object".to_string(),
            )),
            Err(err) => Err(PlanError::MalformedResponse(err.to_string())),
        }
    }
}

pub fn extract_json(raw: &str) -> Result<Map<String, Value>, PlanError> {
    BraceSpanExtractor.extract(raw)
}

/// Values filled into a `/create_cell` payload when the model leaves them out.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDefaults {
    pub notebook_name: String,
    pub cell_type: String,
    pub content: String,
}

impl Default for PlanDefaults {
    fn default() -> Self {
        Self {
            notebook_name: "example.ipynb".to_string(),
            cell_type: "markdown".to_string(),
            content: "# Untitled".to_string(),
        }
    }
}

/// Keep only allow-listed actions and fill in missing payload fields.
pub fn normalize_plan(raw: &Map<String, Value>, defaults: &PlanDefaults) -> Result<Plan, PlanError> {
    let candidates: &[Value] = match raw.get("actions") {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    };

    let mut actions = Vec::new();
    for candidate in candidates {
        let endpoint = candidate.get("endpoint").and_then(Value::as_str);
        let Some(endpoint) = endpoint.filter(|e| ALLOWED_ENDPOINTS.contains(e)) else {
            log::debug!("Dropping action outside the allow-list: {}", candidate);
            continue;
        };

        let mut payload = match candidate.get("payload") {
            Some(Value::Object(payload)) => payload.clone(),
            _ => Map::new(),
        };
        for (key, value) in [
            ("notebook_name", &defaults.notebook_name),
            ("cell_type", &defaults.cell_type),
            ("content", &defaults.content),
        ] {
            payload
                .entry(key)
                .or_insert_with(|| Value::String(value.clone()));
        }

        actions.push(Action {
            endpoint: endpoint.to_string(),
            method: "POST".to_string(),
            payload,
        });
    }

    if actions.is_empty() {
        return Err(PlanError::NoValidActions);
    }
    Ok(Plan { actions })
}

/// Extraction plus normalization, with the extractor swappable.
pub struct PlanValidator {
    extractor: Box<dyn JsonExtractor>,
    defaults: PlanDefaults,
}

impl PlanValidator {
    pub fn new(defaults: PlanDefaults) -> Self {
        Self::with_extractor(Box::new(BraceSpanExtractor), defaults)
    }

    pub fn with_extractor(extractor: Box<dyn JsonExtractor>, defaults: PlanDefaults) -> Self {
        Self {
            extractor,
            defaults,
        }
    }

    pub fn defaults(&self) -> &PlanDefaults {
        &self.defaults
    }

    pub fn validate(&self, raw_text: &str) -> Result<Plan, PlanError> {
        let object = self.extractor.extract(raw_text)?;
        normalize_plan(&object, &self.defaults)
    }
}

impl Default for PlanValidator {
    fn default() -> Self {
        Self::new(PlanDefaults::default())
    }
}
