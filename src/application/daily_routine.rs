//! The Daily Routine: discovery → research → strategy, strictly in order.
//!
//! Each step is recorded in the [`RoutineReport`] as it finishes. The first
//! failing step is recorded as failed and ends the run; the partial report
//! is still returned and still sent to the notification sink.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;

use crate::application::orchestrator::Orchestrator;
use crate::domain::entities::product::Product;
use crate::domain::entities::routine_report::{ReportBuilder, RoutineReport};
use crate::domain::error::DomainError;
use crate::domain::ports::automation_worker::{
    ScanOutcome, StartOutcome, UnitOutput, UnitReport, WorkRequest,
};
use crate::domain::ports::product_ledger::{ProductFilter, ProductLedger};
use crate::domain::ports::strategy_advisor::StrategyAdvisor;
use crate::domain::values::product_status::ProductStatus;
use crate::domain::values::worker_id::WorkerId;

pub const STEP_SCAN: &str = "market_scan";
pub const STEP_RESEARCH: &str = "research";
pub const STEP_STRATEGY: &str = "strategy";

pub const EVENT_COMPLETED: &str = "daily_routine.completed";
pub const EVENT_FAILED: &str = "daily_routine.failed";

/// Topics derived from a scan when none are configured.
const MAX_DERIVED_TOPICS: usize = 3;

#[derive(Debug, Clone)]
pub struct RoutineSettings {
    /// Marketplace niche the scan step searches.
    pub niche: String,
    /// Topics for the research step. Derived from the scan when empty.
    pub research_topics: Vec<String>,
    /// Product ids that get a strategy. Top products by score when empty.
    pub priority_products: Vec<String>,
    /// How many top products to pick when no priority list is set.
    pub max_priority: usize,
    /// Close sessions the routine opened once their step is done.
    pub release_sessions: bool,
}

impl Default for RoutineSettings {
    fn default() -> Self {
        Self {
            niche: "programming".to_string(),
            research_topics: Vec::new(),
            priority_products: Vec::new(),
            max_priority: 3,
            release_sessions: true,
        }
    }
}

pub struct DailyRoutineUseCase {
    orchestrator: Arc<Orchestrator>,
    ledger: Arc<dyn ProductLedger>,
    advisor: Arc<dyn StrategyAdvisor>,
    settings: RoutineSettings,
}

impl DailyRoutineUseCase {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        ledger: Arc<dyn ProductLedger>,
        advisor: Arc<dyn StrategyAdvisor>,
        settings: RoutineSettings,
    ) -> Self {
        Self {
            orchestrator,
            ledger,
            advisor,
            settings,
        }
    }

    /// Run the whole pipeline. Never fails: step failures live in the report.
    pub async fn execute(&self) -> RoutineReport {
        tracing::info!(niche = %self.settings.niche, "daily routine started");
        let mut builder = ReportBuilder::new();
        self.run_steps(&mut builder).await;
        let report = builder.finish();

        let event = if report.is_success() {
            tracing::info!(steps = report.steps.len(), "daily routine completed");
            EVENT_COMPLETED
        } else {
            let failed = report.failed_step().map(|s| s.name.as_str()).unwrap_or_default();
            tracing::warn!(steps = report.steps.len(), %failed, "daily routine stopped early");
            EVENT_FAILED
        };
        let payload = serde_json::to_value(&report).unwrap_or_else(|_| json!({}));
        self.orchestrator.notify(event, payload).await;

        report
    }

    async fn run_steps(&self, report: &mut ReportBuilder) {
        // 1. Discovery
        let scan_request = WorkRequest::Scan {
            niche: self.settings.niche.clone(),
        };
        let scan = match self.worker_step(WorkerId::MarketScanner, vec![scan_request]).await {
            Ok(units) => units.into_iter().find_map(|u| match u.output {
                UnitOutput::Scan(scan) => Some(scan),
                _ => None,
            }),
            Err(e) => {
                report.failed(STEP_SCAN, e);
                return;
            }
        };
        report.completed(STEP_SCAN, to_details(&scan));

        // 2. Research, informed by the scan
        let topics = self.research_topics(scan.as_ref());
        let requests = topics
            .iter()
            .map(|topic| WorkRequest::Research {
                topic: topic.clone(),
            })
            .collect();
        match self.worker_step(WorkerId::Research, requests).await {
            Ok(units) => {
                let outputs: Vec<UnitOutput> = units.into_iter().map(|u| u.output).collect();
                report.completed(STEP_RESEARCH, json!({ "topics": topics, "results": outputs }));
            }
            Err(e) => {
                report.failed(STEP_RESEARCH, e);
                return;
            }
        }

        // 3. Strategy for priority products
        let products = match self.priority_products().await {
            Ok(products) => products,
            Err(e) => {
                report.failed(STEP_STRATEGY, e);
                return;
            }
        };
        if products.is_empty() {
            report.completed(STEP_STRATEGY, json!({ "products": 0 }));
            return;
        }
        for product in &products {
            let step = format!("{STEP_STRATEGY}:{}", product.id);
            match self.advisor.advise(product).await {
                Ok(plan) => report.completed(step, to_details(&plan)),
                Err(e) => {
                    report.failed(step, e);
                    return;
                }
            }
        }
    }

    /// Wake a worker, run its requests in order, and release the session
    /// afterwards if this step's own start opened it. A session someone else
    /// started stays up, even if it was started moments before this step.
    async fn worker_step(
        &self,
        id: WorkerId,
        requests: Vec<WorkRequest>,
    ) -> Result<Vec<UnitReport>, DomainError> {
        let owned = match self.orchestrator.acquire(id).await? {
            Some(outcome) => outcome == StartOutcome::Started,
            None => return Err(DomainError::Deactivated),
        };
        let result = self.run_requests(id, requests).await;

        if self.settings.release_sessions && owned {
            self.orchestrator.halt_worker(id).await?;
        }
        result
    }

    async fn run_requests(
        &self,
        id: WorkerId,
        requests: Vec<WorkRequest>,
    ) -> Result<Vec<UnitReport>, DomainError> {
        let mut units = Vec::with_capacity(requests.len());
        for request in requests {
            units.push(self.orchestrator.run_on(id, request).await?);
        }
        Ok(units)
    }

    fn research_topics(&self, scan: Option<&ScanOutcome>) -> Vec<String> {
        if !self.settings.research_topics.is_empty() {
            return self.settings.research_topics.clone();
        }
        let mut topics = vec![self.settings.niche.clone()];
        if let Some(scan) = scan {
            let mut seen: BTreeSet<String> = topics.iter().cloned().collect();
            for candidate in scan
                .candidates
                .iter()
                .filter(|c| scan.new_products.contains(&c.id))
            {
                if topics.len() >= MAX_DERIVED_TOPICS {
                    break;
                }
                if seen.insert(candidate.name.clone()) {
                    topics.push(candidate.name.clone());
                }
            }
        }
        topics
    }

    async fn priority_products(&self) -> Result<Vec<Product>, DomainError> {
        if self.settings.priority_products.is_empty() {
            let ranked = self.ledger.list_products(&ProductFilter::default()).await?;
            return Ok(ranked
                .into_iter()
                .filter(|p| p.status != ProductStatus::Killed)
                .take(self.settings.max_priority)
                .collect());
        }

        let mut products = Vec::new();
        for id in &self.settings.priority_products {
            match self.ledger.get_product(id).await? {
                Some(product) => products.push(product),
                None => tracing::warn!(product = %id, "priority product not in ledger, skipped"),
            }
        }
        Ok(products)
    }
}

fn to_details<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "serialization_error": e.to_string() }))
}
