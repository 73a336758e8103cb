use crate::domain::entities::product::Product;
use crate::domain::error::DomainError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StrategyPlan {
    pub product_id: String,
    /// Which advisor produced the plan.
    pub advisor: String,
    pub recommendation: String,
    pub generated_at: DateTime<Utc>,
}

/// Downstream strategy computation for a priority product.
#[async_trait]
pub trait StrategyAdvisor: Send + Sync {
    fn name(&self) -> &str;

    async fn advise(&self, product: &Product) -> Result<StrategyPlan, DomainError>;
}
