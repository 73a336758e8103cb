//! The automation worker port.
//!
//! Every worker wraps one long-lived automation session and exposes the
//! same lifecycle: [`AutomationWorker::start`] and
//! [`AutomationWorker::stop`] are idempotent, and
//! [`AutomationWorker::run_unit`] performs one variant-specific unit of
//! work against the open session.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::error::WorkerError;
use crate::domain::values::worker_id::WorkerId;

/// What a caller asks a worker to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkRequest {
    /// Discover candidate products in a niche.
    Scan { niche: String },
    /// Establish an authenticated session.
    Authenticate,
    /// Retrieve reference material for a topic.
    Research { topic: String },
}

impl WorkRequest {
    pub fn label(&self) -> &'static str {
        match self {
            WorkRequest::Scan { .. } => "scan",
            WorkRequest::Authenticate => "authenticate",
            WorkRequest::Research { .. } => "research",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    AlreadyInactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub niche: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub niche: String,
    pub candidates: Vec<Candidate>,
    /// Ids of candidates the ledger had not seen before this scan.
    pub new_products: Vec<String>,
    /// The live surface returned nothing and the cached set was used.
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub account: String,
    pub landing_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub title: String,
    pub url: Option<String>,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub topic: String,
    pub findings: Vec<Finding>,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitOutput {
    Scan(ScanOutcome),
    Login(LoginOutcome),
    Research(ResearchOutcome),
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub worker: WorkerId,
    pub output: UnitOutput,
}

#[async_trait]
pub trait AutomationWorker: Send + Sync {
    fn id(&self) -> WorkerId;

    async fn is_active(&self) -> bool;

    /// Open the session unless one is already open.
    async fn start(&self) -> Result<StartOutcome, WorkerError>;

    /// Perform one unit of work. Fatal failures release the session
    /// before the error is returned.
    async fn run_unit(&self, request: WorkRequest) -> Result<UnitReport, WorkerError>;

    /// Release the session if one is open. Never fails.
    async fn stop(&self) -> StopOutcome;
}
