//! Product scoring and lifecycle status decisions.
//!
//! The score is the mean of a Beta posterior with a uniform prior
//! (Laplace smoothing):
//! - `alpha` = successes + 1
//! - `beta` = failures + 1
//! - `score` = `100 * alpha / (alpha + beta)`
//!
//! A product with no evidence scores exactly 50.00 and the score converges
//! toward the observed conversion rate as trials accumulate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::values::metrics::StatusMetrics;
use crate::domain::values::product_status::ProductStatus;

/// Refund count above which a product is killed regardless of sales.
pub const MAX_REFUNDS: u64 = 5;
/// Refund-to-sales ratio above which a product is killed.
pub const MAX_REFUND_RATE: f64 = 0.2;
/// Sales and clicks a product must exceed to be scaled up.
pub const SCALE_MIN_SALES: u64 = 10;
pub const SCALE_MIN_CLICKS: u64 = 50;
/// Days without a sale before a product is paused.
pub const OBSERVATION_WINDOW_DAYS: u64 = 7;

/// Derived score for one product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    /// Beta-mean success probability, 0–100 with 2 decimals.
    pub mean_probability: f64,
    pub computed_at: DateTime<Utc>,
}

impl ScoreState {
    pub fn compute(successes: u64, trials: u64) -> Self {
        Self {
            mean_probability: compute_score(successes, trials),
            computed_at: Utc::now(),
        }
    }

    /// Score state of a product nobody has measured yet.
    pub fn initial() -> Self {
        Self::compute(0, 0)
    }
}

/// Lowest and highest score after rounding. Large, lopsided counts would
/// otherwise round onto 0.00 or 100.00.
pub const MIN_SCORE: f64 = 0.01;
pub const MAX_SCORE: f64 = 99.99;

/// Laplace-smoothed Beta mean, scaled to 0–100 and rounded to 2 decimals.
///
/// When `trials < successes` the failure tally saturates at zero instead of
/// going negative. The rounded value is clamped to
/// [`MIN_SCORE`, `MAX_SCORE`] so it never reaches the bounds.
pub fn compute_score(successes: u64, trials: u64) -> f64 {
    let alpha = successes as f64 + 1.0;
    let beta = trials.saturating_sub(successes) as f64 + 1.0;
    let score = 100.0 * alpha / (alpha + beta);
    ((score * 100.0).round() / 100.0).clamp(MIN_SCORE, MAX_SCORE)
}

/// Decide the lifecycle status from the current cumulative metrics.
///
/// Rules are evaluated in order and the first match wins:
/// 1. refunds > 5, or refund rate > 20% → `Killed`
/// 2. sales > 10 and clicks > 50 → `Scaling`
/// 3. any sale → `Active`
/// 4. no sale after 7 days → `Paused`
/// 5. otherwise → `Testing`
///
/// The decision has no memory of the previous status, so a `Killed`
/// product whose refunds are later outweighed is classified again.
pub fn decide_status(metrics: &StatusMetrics, days_active: u64) -> ProductStatus {
    let StatusMetrics {
        sales,
        clicks,
        refund_count,
    } = *metrics;

    let refund_rate = if sales > 0 {
        refund_count as f64 / sales as f64
    } else {
        0.0
    };
    if refund_count > MAX_REFUNDS || (sales > 0 && refund_rate > MAX_REFUND_RATE) {
        return ProductStatus::Killed;
    }

    if sales > SCALE_MIN_SALES && clicks > SCALE_MIN_CLICKS {
        return ProductStatus::Scaling;
    }

    if sales > 0 {
        return ProductStatus::Active;
    }

    if days_active > OBSERVATION_WINDOW_DAYS {
        return ProductStatus::Paused;
    }

    ProductStatus::Testing
}
