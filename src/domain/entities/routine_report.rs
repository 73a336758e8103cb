use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub name: String,
    pub status: StepStatus,
    pub details: serde_json::Value,
}

/// Outcome of one Daily Routine run. Steps appear in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct RoutineReport {
    pub date: DateTime<Utc>,
    pub steps: Vec<StepResult>,
}

impl RoutineReport {
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }
}

/// Accumulates steps while a routine runs and freezes into a report.
#[derive(Debug)]
pub(crate) struct ReportBuilder {
    date: DateTime<Utc>,
    steps: Vec<StepResult>,
}

impl ReportBuilder {
    pub(crate) fn new() -> Self {
        Self {
            date: Utc::now(),
            steps: Vec::new(),
        }
    }

    pub(crate) fn completed(&mut self, name: impl Into<String>, details: serde_json::Value) {
        self.steps.push(StepResult {
            name: name.into(),
            status: StepStatus::Completed,
            details,
        });
    }

    pub(crate) fn failed(&mut self, name: impl Into<String>, error: impl std::fmt::Display) {
        self.steps.push(StepResult {
            name: name.into(),
            status: StepStatus::Failed,
            details: serde_json::json!({ "error": error.to_string() }),
        });
    }

    pub(crate) fn finish(self) -> RoutineReport {
        RoutineReport {
            date: self.date,
            steps: self.steps,
        }
    }
}
