use crate::domain::entities::product::Product;
use crate::domain::error::DomainError;
use crate::domain::values::metrics::{LedgerMetrics, MetricsSnapshot};
use crate::domain::values::product_status::ProductStatus;
use crate::domain::values::scoring::ScoreState;
use async_trait::async_trait;

/// Turns cumulative counters into a score and a lifecycle status.
pub type Scorer = dyn Fn(&LedgerMetrics) -> (ScoreState, ProductStatus) + Send + Sync;

/// Counters, score and status as committed by one metrics write.
#[derive(Debug, Clone, Copy)]
pub struct ScoredMetrics {
    pub metrics: LedgerMetrics,
    pub score: ScoreState,
    pub status: ProductStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub limit: Option<usize>,
}

/// System of record for products and their score state.
#[async_trait]
pub trait ProductLedger: Send + Sync {
    /// Store a newly discovered product. Returns `false` if the id was
    /// already tracked, in which case nothing changes.
    async fn insert_if_new(&self, product: &Product) -> Result<bool, DomainError>;

    async fn get_product(&self, id: &str) -> Result<Option<Product>, DomainError>;

    /// Products ordered by score, best first.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, DomainError>;

    /// Add a snapshot to the product's cumulative counters, score the new
    /// totals with `scorer`, and commit counters, score and status together.
    /// Counters saturate instead of overflowing.
    async fn record_metrics(
        &self,
        id: &str,
        snapshot: &MetricsSnapshot,
        scorer: &Scorer,
    ) -> Result<ScoredMetrics, DomainError>;

    async fn metrics(&self, id: &str) -> Result<Option<LedgerMetrics>, DomainError>;

    /// Persist score and status together.
    async fn write_score(
        &self,
        id: &str,
        score: &ScoreState,
        status: ProductStatus,
    ) -> Result<(), DomainError>;
}
