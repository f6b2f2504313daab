use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One remote call proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub endpoint: String,
    pub method: String,
    pub payload: Map<String, Value>,
}

/// A validated, ordered, non-empty list of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

/// What happened when one action was sent to the notebook service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionOutcome {
    Completed {
        endpoint: String,
        status_code: u16,
        response_body: Value,
    },
    Failed {
        endpoint: String,
        error: String,
    },
}

impl ActionOutcome {
    pub fn endpoint(&self) -> &str {
        match self {
            ActionOutcome::Completed { endpoint, .. } | ActionOutcome::Failed { endpoint, .. } => {
                endpoint
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed { .. })
    }
}

/// Successful reply of the agent's chat operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub plan: Plan,
    pub results: Vec<ActionOutcome>,
}
