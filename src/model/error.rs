/// Failures of the notebook mutation engine and its store.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    /// Bad argument the caller can correct (cell type, direction, places, name)
    #[error("{0}")]
    InvalidArgument(String),

    /// Cell position outside `0..len`
    #[error("Cell number {index} is out of range for {notebook} ({len} cells)")]
    IndexOutOfRange {
        index: i64,
        len: usize,
        notebook: String,
    },

    /// Anything that went wrong reading, serializing or replacing the file
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl NotebookError {
    /// True for errors the caller caused and can fix by changing the request.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, NotebookError::Storage(_))
    }
}

/// Failures turning raw model text into a plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("No valid actions found")]
    NoValidActions,
}

/// Failures of one chat turn.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("No notebook servers connected")]
    NoServerConnected,

    #[error("model call failed: {0}")]
    Transport(String),

    #[error("{source}")]
    Plan {
        source: PlanError,
        raw_response: String,
    },
}
