use crate::domain::values::product_status::ProductStatus;
use crate::domain::values::scoring::ScoreState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Opaque id assigned by the marketplace.
    pub id: String,
    pub name: String,
    pub niche: String,
    pub url: Option<String>,
    pub status: ProductStatus,
    pub score: ScoreState,
    pub first_seen_at: DateTime<Utc>,
}

impl Product {
    /// A freshly discovered product: `testing`, with an uninformed score.
    pub fn discovered(id: String, name: String, niche: String, url: Option<String>) -> Self {
        Self {
            id,
            name,
            niche,
            url,
            status: ProductStatus::Testing,
            score: ScoreState::initial(),
            first_seen_at: Utc::now(),
        }
    }

    /// Whole days elapsed since the product was first tracked.
    pub fn days_active(&self) -> u64 {
        days_since(self.first_seen_at)
    }
}

pub fn days_since(since: DateTime<Utc>) -> u64 {
    (Utc::now() - since).num_days().max(0) as u64
}
