//! Owned background runs of the Daily Routine.
//!
//! A trigger gets a [`RunTicket`] back immediately; the run itself is a
//! spawned task whose state is published on a `watch` channel and can be
//! polled or awaited by id. At most one run is in flight at a time.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::application::daily_routine::DailyRoutineUseCase;
use crate::domain::entities::routine_report::RoutineReport;
use crate::domain::error::DomainError;

const MAX_HISTORY: usize = 32;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Running { started_at: DateTime<Utc> },
    Finished { report: RoutineReport },
    /// The task ended without publishing a report.
    Crashed { error: String },
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunTicket {
    pub run_id: String,
    /// The id belongs to a run that was already in flight.
    pub already_running: bool,
}

#[derive(Default)]
struct Runs {
    states: HashMap<String, watch::Receiver<RunState>>,
    order: VecDeque<String>,
    current: Option<String>,
}

pub struct RoutineRunner {
    routine: Arc<DailyRoutineUseCase>,
    runs: Mutex<Runs>,
}

impl RoutineRunner {
    pub fn new(routine: Arc<DailyRoutineUseCase>) -> Self {
        Self {
            routine,
            runs: Mutex::new(Runs::default()),
        }
    }

    /// Start a run in the background unless one is still going.
    pub async fn spawn(&self) -> RunTicket {
        let mut runs = self.runs.lock().await;

        if let Some(current) = runs.current.clone() {
            if runs.states.get(&current).map(observe).is_some_and(|s| s.is_running()) {
                tracing::info!(run_id = %current, "daily routine already running");
                return RunTicket {
                    run_id: current,
                    already_running: true,
                };
            }
        }

        let run_id = Uuid::new_v4().to_string();
        let (tx, rx) = watch::channel(RunState::Running {
            started_at: Utc::now(),
        });

        let routine = Arc::clone(&self.routine);
        let id = run_id.clone();
        tokio::spawn(async move {
            let report = routine.execute().await;
            tracing::info!(run_id = %id, success = report.is_success(), "background routine finished");
            let _ = tx.send(RunState::Finished { report });
        });

        runs.states.insert(run_id.clone(), rx);
        runs.order.push_back(run_id.clone());
        runs.current = Some(run_id.clone());
        while runs.order.len() > MAX_HISTORY {
            if let Some(oldest) = runs.order.pop_front() {
                runs.states.remove(&oldest);
            }
        }

        tracing::info!(%run_id, "daily routine spawned");
        RunTicket {
            run_id,
            already_running: false,
        }
    }

    pub async fn state(&self, run_id: &str) -> Option<RunState> {
        self.runs.lock().await.states.get(run_id).map(observe)
    }

    /// Wait until the run leaves the running state.
    pub async fn wait(&self, run_id: &str) -> Result<RunState, DomainError> {
        let mut rx = self
            .runs
            .lock()
            .await
            .states
            .get(run_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("routine run {run_id}")))?;

        let result = rx.wait_for(|s| !s.is_running()).await.map(|s| s.clone());
        match result {
            Ok(state) => Ok(state),
            Err(_) => Ok(crashed()),
        }
    }
}

fn observe(rx: &watch::Receiver<RunState>) -> RunState {
    let state = rx.borrow().clone();
    // A closed channel still showing `Running` means the task died.
    if state.is_running() && rx.has_changed().is_err() {
        crashed()
    } else {
        state
    }
}

fn crashed() -> RunState {
    RunState::Crashed {
        error: "routine task ended without a report".to_string(),
    }
}
