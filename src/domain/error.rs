use crate::domain::values::worker_id::WorkerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Worker not supported: {0}")]
    UnsupportedWorker(String),

    #[error("Orchestrator is deactivated")]
    Deactivated,

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Strategy error: {0}")]
    Strategy(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Database(e.to_string())
    }
}

impl From<&str> for DomainError {
    fn from(s: &str) -> Self {
        DomainError::InvalidInput(s.to_string())
    }
}

/// Failures raised by an automation worker. Every variant names the worker
/// so a caller can report which one failed and why.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The session could not be acquired. The worker stays inactive.
    #[error("{worker}: unavailable: {reason}")]
    Unavailable { worker: WorkerId, reason: String },

    #[error("{worker}: no active session, wake the worker first")]
    NotStarted { worker: WorkerId },

    #[error("{worker}: cannot handle request '{request}'")]
    UnsupportedRequest { worker: WorkerId, request: String },

    /// The target surface stopped at an interactive screen (challenge,
    /// verification). Needs an operator, never retried automatically.
    #[error("{worker}: needs manual intervention: {reason}")]
    NeedsIntervention { worker: WorkerId, reason: String },

    #[error("{worker}: rejected by target: {reason}")]
    Rejected { worker: WorkerId, reason: String },

    #[error("{worker}: unit of work timed out after {seconds}s")]
    Timeout { worker: WorkerId, seconds: u64 },

    #[error("{worker}: {reason}")]
    Failed { worker: WorkerId, reason: String },
}

impl WorkerError {
    pub fn worker(&self) -> WorkerId {
        match self {
            WorkerError::Unavailable { worker, .. }
            | WorkerError::NotStarted { worker }
            | WorkerError::UnsupportedRequest { worker, .. }
            | WorkerError::NeedsIntervention { worker, .. }
            | WorkerError::Rejected { worker, .. }
            | WorkerError::Timeout { worker, .. }
            | WorkerError::Failed { worker, .. } => *worker,
        }
    }

    /// Whether the failure poisons the session. Fatal errors release it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WorkerError::Rejected { .. } | WorkerError::Timeout { .. } | WorkerError::Failed { .. }
        )
    }
}
