use serde::{Deserialize, Serialize};

/// Counters supplied by a caller for one scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub sales: u64,
    #[serde(default)]
    pub clicks: u64,
    /// Informational only, never read by the status decision.
    #[serde(default)]
    pub social_engagement: u64,
    #[serde(default)]
    pub refund_count: u64,
}

impl MetricsSnapshot {
    /// Field-wise sum that sticks at `u64::MAX`.
    pub fn saturating_add(&self, other: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            sales: self.sales.saturating_add(other.sales),
            clicks: self.clicks.saturating_add(other.clicks),
            social_engagement: self.social_engagement.saturating_add(other.social_engagement),
            refund_count: self.refund_count.saturating_add(other.refund_count),
        }
    }

    /// The subset the status decision looks at.
    pub fn status_metrics(&self) -> StatusMetrics {
        StatusMetrics {
            sales: self.sales,
            clicks: self.clicks,
            refund_count: self.refund_count,
        }
    }
}

/// Inputs to [`decide_status`](crate::domain::values::scoring::decide_status).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusMetrics {
    pub sales: u64,
    pub clicks: u64,
    pub refund_count: u64,
}

/// Cumulative counters for one product as aggregated by the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerMetrics {
    pub totals: MetricsSnapshot,
    pub days_active: u64,
}
