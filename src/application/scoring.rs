use crate::application::notify::deliver_best_effort;
use crate::domain::entities::product::Product;
use crate::domain::error::DomainError;
use crate::domain::ports::notification_sink::NotificationSink;
use crate::domain::ports::product_ledger::{ProductFilter, ProductLedger, ScoredMetrics};
use crate::domain::values::metrics::{LedgerMetrics, MetricsSnapshot};
use crate::domain::values::product_status::ProductStatus;
use crate::domain::values::scoring::{decide_status, ScoreState};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

pub const EVENT_STATUS_CHANGED: &str = "product.status_changed";

pub struct ScoringUseCase {
    ledger: Arc<dyn ProductLedger>,
    notifier: Arc<dyn NotificationSink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreOutcome {
    pub product_id: String,
    pub score: ScoreState,
    pub previous_status: ProductStatus,
    pub status: ProductStatus,
    pub metrics: LedgerMetrics,
}

impl ScoreOutcome {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.status
    }
}

#[derive(Debug, Default, Serialize)]
pub struct RescoreReport {
    pub checked: usize,
    pub changed: Vec<ScoreOutcome>,
    pub errors: Vec<String>,
}

impl ScoringUseCase {
    pub fn new(ledger: Arc<dyn ProductLedger>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { ledger, notifier }
    }

    /// Fold a metrics snapshot into the product's counters, then rescore.
    pub async fn record_metrics(
        &self,
        product_id: &str,
        snapshot: &MetricsSnapshot,
    ) -> Result<ScoreOutcome, DomainError> {
        let product = self.require(product_id).await?;
        let recorded = self
            .ledger
            .record_metrics(product_id, snapshot, &score_metrics)
            .await?;
        Ok(self.settle(product, recorded).await)
    }

    /// Recompute score and status from the stored cumulative counters.
    pub async fn rescore(&self, product_id: &str) -> Result<ScoreOutcome, DomainError> {
        let product = self.require(product_id).await?;
        self.score(product).await
    }

    /// Rescore every tracked product. One product's failure does not stop
    /// the others.
    pub async fn rescore_all(&self) -> Result<RescoreReport, DomainError> {
        let products = self.ledger.list_products(&ProductFilter::default()).await?;
        let mut report = RescoreReport {
            checked: products.len(),
            ..Default::default()
        };

        for product in products {
            let id = product.id.clone();
            match self.score(product).await {
                Ok(outcome) if outcome.status_changed() => report.changed.push(outcome),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(product = %id, error = %e, "rescore failed");
                    report.errors.push(format!("{id}: {e}"));
                }
            }
        }
        Ok(report)
    }

    async fn require(&self, product_id: &str) -> Result<Product, DomainError> {
        self.ledger
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("product {product_id}")))
    }

    async fn score(&self, product: Product) -> Result<ScoreOutcome, DomainError> {
        // Never-measured products score on zero counters.
        let metrics = self.ledger.metrics(&product.id).await?.unwrap_or(LedgerMetrics {
            totals: MetricsSnapshot::default(),
            days_active: product.days_active(),
        });
        let (score, status) = score_metrics(&metrics);
        self.ledger.write_score(&product.id, &score, status).await?;

        let recorded = ScoredMetrics {
            metrics,
            score,
            status,
        };
        Ok(self.settle(product, recorded).await)
    }

    /// Log the committed result and announce status changes.
    async fn settle(&self, product: Product, recorded: ScoredMetrics) -> ScoreOutcome {
        let outcome = ScoreOutcome {
            product_id: product.id,
            score: recorded.score,
            previous_status: product.status,
            status: recorded.status,
            metrics: recorded.metrics,
        };
        tracing::debug!(
            product = %outcome.product_id,
            score = outcome.score.mean_probability,
            status = %outcome.status,
            "product scored"
        );

        if outcome.status_changed() {
            tracing::info!(
                product = %outcome.product_id,
                from = %outcome.previous_status,
                to = %outcome.status,
                "product status changed"
            );
            let payload = json!({
                "product_id": outcome.product_id,
                "previous_status": outcome.previous_status,
                "status": outcome.status,
                "score": outcome.score.mean_probability,
            });
            deliver_best_effort(self.notifier.as_ref(), EVENT_STATUS_CHANGED, payload).await;
        }
        outcome
    }
}

fn score_metrics(metrics: &LedgerMetrics) -> (ScoreState, ProductStatus) {
    let totals = metrics.totals;
    (
        ScoreState::compute(totals.sales, totals.clicks),
        decide_status(&totals.status_metrics(), metrics.days_active),
    )
}
