//! Single point of control for automation workers.
//!
//! The orchestrator owns the worker registry (a lookup table keyed by
//! [`WorkerId`]) and the system on/off state. Deactivating the system halts
//! every worker and makes further `wake` calls no-ops until it is
//! activated again.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::application::notify::deliver_best_effort;
use crate::domain::error::DomainError;
use crate::domain::ports::automation_worker::{
    AutomationWorker, StartOutcome, StopOutcome, UnitReport, WorkRequest,
};
use crate::domain::ports::notification_sink::NotificationSink;
use crate::domain::values::worker_id::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemState {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub worker: WorkerId,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub system: SystemState,
    pub workers: Vec<WorkerStatus>,
}

pub struct Orchestrator {
    workers: HashMap<WorkerId, Arc<dyn AutomationWorker>>,
    notifier: Arc<dyn NotificationSink>,
    state: RwLock<SystemState>,
}

impl Orchestrator {
    /// Starts in the active state.
    pub fn new(workers: Vec<Arc<dyn AutomationWorker>>, notifier: Arc<dyn NotificationSink>) -> Self {
        let workers = workers.into_iter().map(|w| (w.id(), w)).collect();
        Self {
            workers,
            notifier,
            state: RwLock::new(SystemState::Active),
        }
    }

    fn lookup(&self, worker: &str) -> Result<WorkerId, DomainError> {
        let id: WorkerId = worker
            .parse()
            .map_err(|_| DomainError::UnsupportedWorker(worker.to_string()))?;
        if self.workers.contains_key(&id) {
            Ok(id)
        } else {
            Err(DomainError::UnsupportedWorker(worker.to_string()))
        }
    }

    fn worker(&self, id: WorkerId) -> Result<&Arc<dyn AutomationWorker>, DomainError> {
        self.workers
            .get(&id)
            .ok_or_else(|| DomainError::UnsupportedWorker(id.to_string()))
    }

    pub async fn system_state(&self) -> SystemState {
        *self.state.read().await
    }

    /// Start the named worker unless it is already running. Returns whether
    /// the worker is now controllable: `false` while the system is
    /// deactivated.
    pub async fn wake(&self, worker: &str) -> Result<bool, DomainError> {
        let id = self.lookup(worker)?;
        self.wake_worker(id).await
    }

    pub async fn wake_worker(&self, id: WorkerId) -> Result<bool, DomainError> {
        match self.acquire(id).await? {
            Some(_) => Ok(self.worker(id)?.is_active().await),
            None => Ok(false),
        }
    }

    /// Start a worker and report who opened its session. `Started` means
    /// this call did, and the caller is the one expected to halt it.
    /// `None` while the system is deactivated.
    pub async fn acquire(&self, id: WorkerId) -> Result<Option<StartOutcome>, DomainError> {
        let worker = self.worker(id)?;
        // Held across start so a concurrent deactivate cannot miss this worker.
        let state = self.state.read().await;
        if *state == SystemState::Inactive {
            tracing::info!(worker = %id, "wake ignored, system deactivated");
            return Ok(None);
        }
        let outcome = worker.start().await?;
        tracing::info!(worker = %id, ?outcome, "worker awake");
        Ok(Some(outcome))
    }

    /// Stop the named worker. Idempotent.
    pub async fn halt(&self, worker: &str) -> Result<StopOutcome, DomainError> {
        let id = self.lookup(worker)?;
        self.halt_worker(id).await
    }

    pub async fn halt_worker(&self, id: WorkerId) -> Result<StopOutcome, DomainError> {
        let outcome = self.worker(id)?.stop().await;
        tracing::info!(worker = %id, ?outcome, "worker halted");
        Ok(outcome)
    }

    /// Wake a worker and run one unit of work on it.
    pub async fn run_worker(&self, worker: &str, request: WorkRequest) -> Result<UnitReport, DomainError> {
        let id = self.lookup(worker)?;
        self.run_on(id, request).await
    }

    pub async fn run_on(&self, id: WorkerId, request: WorkRequest) -> Result<UnitReport, DomainError> {
        if !self.wake_worker(id).await? {
            return Err(DomainError::Deactivated);
        }
        let report = self.worker(id)?.run_unit(request).await?;
        Ok(report)
    }

    pub async fn activate(&self) -> SystemState {
        let mut state = self.state.write().await;
        if *state == SystemState::Inactive {
            tracing::info!("system activated");
        }
        *state = SystemState::Active;
        *state
    }

    /// Switch the system off and halt every worker.
    pub async fn deactivate(&self) -> Vec<(WorkerId, StopOutcome)> {
        {
            let mut state = self.state.write().await;
            *state = SystemState::Inactive;
        }
        let halts = self.ordered().into_iter().map(|w| async move {
            let outcome = w.stop().await;
            (w.id(), outcome)
        });
        let halted = join_all(halts).await;
        tracing::info!(workers = halted.len(), "system deactivated");
        halted
    }

    pub async fn status(&self) -> OrchestratorStatus {
        let mut workers = Vec::with_capacity(self.workers.len());
        for w in self.ordered() {
            workers.push(WorkerStatus {
                worker: w.id(),
                active: w.is_active().await,
            });
        }
        OrchestratorStatus {
            system: self.system_state().await,
            workers,
        }
    }

    /// Fire-and-forget delivery to the notification sink.
    pub async fn notify(&self, event: &str, payload: serde_json::Value) {
        deliver_best_effort(self.notifier.as_ref(), event, payload).await;
    }

    fn ordered(&self) -> Vec<&Arc<dyn AutomationWorker>> {
        WorkerId::ALL
            .iter()
            .filter_map(|id| self.workers.get(id))
            .collect()
    }
}
