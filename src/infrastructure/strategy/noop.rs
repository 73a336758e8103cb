use crate::domain::entities::product::Product;
use crate::domain::error::DomainError;
use crate::domain::ports::strategy_advisor::{StrategyAdvisor, StrategyPlan};
use crate::domain::values::product_status::ProductStatus;
use async_trait::async_trait;
use chrono::Utc;

/// Rule-of-thumb plans derived from status and score, no model involved.
pub struct NoopAdvisor;

#[async_trait]
impl StrategyAdvisor for NoopAdvisor {
    fn name(&self) -> &str {
        "noop"
    }

    async fn advise(&self, product: &Product) -> Result<StrategyPlan, DomainError> {
        let recommendation = match product.status {
            ProductStatus::Testing => format!(
                "Keep testing '{}': drive a small batch of traffic and collect clicks.",
                product.name
            ),
            ProductStatus::Active => format!(
                "'{}' converts at ~{:.2}%. Add one more channel and watch refunds.",
                product.name, product.score.mean_probability
            ),
            ProductStatus::Scaling => format!(
                "Scale '{}': raise posting frequency in the {} niche.",
                product.name, product.niche
            ),
            ProductStatus::Paused => format!(
                "'{}' has not sold. Rework the angle before spending more.",
                product.name
            ),
            ProductStatus::Killed => format!("Stop promoting '{}'.", product.name),
        };

        Ok(StrategyPlan {
            product_id: product.id.clone(),
            advisor: self.name().to_string(),
            recommendation,
            generated_at: Utc::now(),
        })
    }
}
