pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::daily_routine::DailyRoutineUseCase;
use crate::application::orchestrator::{Orchestrator, OrchestratorStatus, SystemState};
use crate::application::routine_runner::{RoutineRunner, RunState, RunTicket};
use crate::application::scoring::{RescoreReport, ScoreOutcome, ScoringUseCase};
use crate::config::PilotConfig;
use crate::domain::entities::product::Product;
use crate::domain::entities::routine_report::RoutineReport;
use crate::domain::error::DomainError;
use crate::domain::ports::automation_worker::{AutomationWorker, StopOutcome, UnitReport, WorkRequest};
use crate::domain::ports::notification_sink::NotificationSink;
use crate::domain::ports::product_ledger::{ProductFilter, ProductLedger};
use crate::domain::ports::session::SessionLauncher;
use crate::domain::ports::strategy_advisor::StrategyAdvisor;
use crate::domain::values::metrics::MetricsSnapshot;
use crate::domain::values::worker_id::WorkerId;
use crate::infrastructure::notify::log::LogNotifier;
use crate::infrastructure::notify::webhook::WebhookNotifier;
use crate::infrastructure::session::http::HttpSessionLauncher;
use crate::infrastructure::sqlite::migrations::run_migrations;
use crate::infrastructure::sqlite::product_ledger::SqliteProductLedger;
use crate::infrastructure::strategy::noop::NoopAdvisor;
use crate::infrastructure::strategy::ollama::OllamaAdvisor;
use crate::infrastructure::workers::market_scanner::MarketScanner;
use crate::infrastructure::workers::research::ResearchWorker;
use crate::infrastructure::workers::social::{SocialCredentials, SocialWorker};
use rusqlite::Connection;
use std::sync::Arc;

pub struct ProductPilot {
    orchestrator: Arc<Orchestrator>,
    ledger: Arc<dyn ProductLedger>,
    routine_uc: Arc<DailyRoutineUseCase>,
    scoring_uc: ScoringUseCase,
    runner: RoutineRunner,
}

impl ProductPilot {
    pub fn new(config: &PilotConfig) -> Result<Self, DomainError> {
        let launcher: Arc<dyn SessionLauncher> = Arc::new(HttpSessionLauncher::default());

        let notifier: Arc<dyn NotificationSink> = match &config.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
            None => Arc::new(LogNotifier),
        };

        let advisor: Arc<dyn StrategyAdvisor> = match config.strategy_provider.as_str() {
            "ollama" => Arc::new(OllamaAdvisor::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            )),
            "noop" => Arc::new(NoopAdvisor),
            other => {
                tracing::warn!(provider = %other, "unknown strategy provider, using noop");
                Arc::new(NoopAdvisor)
            }
        };

        Self::with_providers(config, launcher, notifier, advisor)
    }

    pub fn with_providers(
        config: &PilotConfig,
        launcher: Arc<dyn SessionLauncher>,
        notifier: Arc<dyn NotificationSink>,
        advisor: Arc<dyn StrategyAdvisor>,
    ) -> Result<Self, DomainError> {
        let conn = Connection::open(&config.db_path)
            .map_err(|e| DomainError::Database(format!("DB error: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| DomainError::Database(format!("WAL error: {e}")))?;
        run_migrations(&conn)?;

        let ledger: Arc<dyn ProductLedger> = Arc::new(SqliteProductLedger::new(conn));

        let credentials = match (&config.social_username, &config.social_password) {
            (Some(username), Some(password)) => Some(SocialCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        let workers: Vec<Arc<dyn AutomationWorker>> = vec![
            Arc::new(MarketScanner::new(
                config.market_url.clone(),
                ledger.clone(),
                launcher.clone(),
                config.unit_timeout,
            )),
            Arc::new(SocialWorker::new(
                config.social_url.clone(),
                credentials,
                launcher.clone(),
                config.unit_timeout,
            )),
            Arc::new(ResearchWorker::new(
                config.research_url.clone(),
                launcher,
                config.unit_timeout,
            )),
        ];

        let orchestrator = Arc::new(Orchestrator::new(workers, notifier.clone()));
        let routine_uc = Arc::new(DailyRoutineUseCase::new(
            orchestrator.clone(),
            ledger.clone(),
            advisor,
            config.routine.clone(),
        ));

        Ok(Self {
            runner: RoutineRunner::new(routine_uc.clone()),
            scoring_uc: ScoringUseCase::new(ledger.clone(), notifier),
            orchestrator,
            ledger,
            routine_uc,
        })
    }

    // Worker control
    pub async fn wake(&self, worker: &str) -> Result<bool, DomainError> {
        self.orchestrator.wake(worker).await
    }

    pub async fn halt(&self, worker: &str) -> Result<StopOutcome, DomainError> {
        self.orchestrator.halt(worker).await
    }

    pub async fn run_worker(&self, worker: &str, request: WorkRequest) -> Result<UnitReport, DomainError> {
        self.orchestrator.run_worker(worker, request).await
    }

    pub async fn activate(&self) -> SystemState {
        self.orchestrator.activate().await
    }

    pub async fn deactivate(&self) -> Vec<(WorkerId, StopOutcome)> {
        self.orchestrator.deactivate().await
    }

    pub async fn status(&self) -> OrchestratorStatus {
        self.orchestrator.status().await
    }

    // Daily Routine
    pub async fn run_daily_routine(&self) -> RoutineReport {
        self.routine_uc.execute().await
    }

    pub async fn start_daily_routine(&self) -> RunTicket {
        self.runner.spawn().await
    }

    pub async fn routine_run(&self, run_id: &str) -> Option<RunState> {
        self.runner.state(run_id).await
    }

    pub async fn wait_for_routine(&self, run_id: &str) -> Result<RunState, DomainError> {
        self.runner.wait(run_id).await
    }

    // Scoring
    pub async fn record_metrics(
        &self,
        product_id: &str,
        snapshot: &MetricsSnapshot,
    ) -> Result<ScoreOutcome, DomainError> {
        self.scoring_uc.record_metrics(product_id, snapshot).await
    }

    pub async fn rescore(&self, product_id: &str) -> Result<ScoreOutcome, DomainError> {
        self.scoring_uc.rescore(product_id).await
    }

    pub async fn rescore_all(&self) -> Result<RescoreReport, DomainError> {
        self.scoring_uc.rescore_all().await
    }

    // Ledger
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, DomainError> {
        self.ledger.list_products(filter).await
    }

    pub async fn product(&self, product_id: &str) -> Result<Option<Product>, DomainError> {
        self.ledger.get_product(product_id).await
    }

    /// Halt every worker so no session outlives the process.
    pub async fn shutdown(&self) {
        for (worker, outcome) in self.orchestrator.deactivate().await {
            tracing::debug!(%worker, ?outcome, "released at shutdown");
        }
    }
}
