mod common;

use common::{setup, setup_full, test_config, FakeLauncher, RecordingSink};
use productpilot::application::scoring::EVENT_STATUS_CHANGED;
use productpilot::domain::error::DomainError;
use productpilot::domain::ports::automation_worker::WorkRequest;
use productpilot::domain::ports::product_ledger::ProductFilter;
use productpilot::domain::values::metrics::MetricsSnapshot;
use productpilot::domain::values::product_status::ProductStatus;
use productpilot::infrastructure::strategy::noop::NoopAdvisor;
use productpilot::ProductPilot;
use std::sync::Arc;

fn snapshot(sales: u64, clicks: u64, refund_count: u64) -> MetricsSnapshot {
    MetricsSnapshot {
        sales,
        clicks,
        social_engagement: 0,
        refund_count,
    }
}

async fn discover(pilot: &ProductPilot) {
    pilot
        .run_worker("market_scanner", WorkRequest::Scan { niche: "programming".into() })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let h = setup();
    let err = h.pilot.record_metrics("ghost", &snapshot(1, 1, 0)).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert!(matches!(h.pilot.rescore("ghost").await, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_new_product_rescore_stays_testing() {
    let h = setup();
    discover(&h.pilot).await;

    let outcome = h.pilot.rescore("101").await.unwrap();
    assert_eq!(outcome.score.mean_probability, 50.0);
    assert_eq!(outcome.status, ProductStatus::Testing);
    assert!(!outcome.status_changed());
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn test_metrics_accumulate_across_snapshots() {
    let h = setup();
    discover(&h.pilot).await;

    h.pilot.record_metrics("101", &snapshot(3, 10, 0)).await.unwrap();
    let outcome = h.pilot.record_metrics("101", &snapshot(3, 10, 0)).await.unwrap();

    assert_eq!(outcome.metrics.totals.sales, 6);
    assert_eq!(outcome.metrics.totals.clicks, 20);
    // alpha = 7, beta = 15
    assert_eq!(outcome.score.mean_probability, 31.82);
    assert_eq!(outcome.status, ProductStatus::Active);
    assert_eq!(outcome.previous_status, ProductStatus::Active);
}

#[tokio::test]
async fn test_status_change_is_written_and_notified() {
    let h = setup();
    discover(&h.pilot).await;

    let outcome = h.pilot.record_metrics("202", &snapshot(12, 60, 0)).await.unwrap();
    assert_eq!(outcome.previous_status, ProductStatus::Testing);
    assert_eq!(outcome.status, ProductStatus::Scaling);
    assert_eq!(outcome.score.mean_probability, 20.97);

    let stored = h.pilot.product("202").await.unwrap().unwrap();
    assert_eq!(stored.status, ProductStatus::Scaling);
    assert_eq!(stored.score.mean_probability, 20.97);

    let sent = h.sink.last(EVENT_STATUS_CHANGED).unwrap();
    assert_eq!(sent.payload["product_id"], "202");
    assert_eq!(sent.payload["previous_status"], "testing");
    assert_eq!(sent.payload["status"], "scaling");
}

#[tokio::test]
async fn test_killed_product_can_recover() {
    let h = setup();
    discover(&h.pilot).await;

    let killed = h.pilot.record_metrics("101", &snapshot(1, 5, 1)).await.unwrap();
    assert_eq!(killed.status, ProductStatus::Killed);

    let recovered = h.pilot.record_metrics("101", &snapshot(20, 100, 0)).await.unwrap();
    assert_eq!(recovered.previous_status, ProductStatus::Killed);
    assert_eq!(recovered.status, ProductStatus::Scaling);
}

#[tokio::test]
async fn test_refund_count_kills_regardless_of_sales() {
    let h = setup();
    discover(&h.pilot).await;

    let outcome = h.pilot.record_metrics("101", &snapshot(100, 500, 6)).await.unwrap();
    assert_eq!(outcome.status, ProductStatus::Killed);
}

#[tokio::test]
async fn test_rescore_all_reports_changes() {
    let h = setup();
    discover(&h.pilot).await;
    h.pilot.record_metrics("101", &snapshot(2, 10, 0)).await.unwrap();

    let report = h.pilot.rescore_all().await.unwrap();
    assert_eq!(report.checked, 2);
    assert!(report.changed.is_empty());
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_products_are_ranked_and_filtered() {
    let h = setup();
    discover(&h.pilot).await;
    h.pilot.record_metrics("202", &snapshot(5, 7, 0)).await.unwrap();

    let all = h.pilot.products(&ProductFilter::default()).await.unwrap();
    assert_eq!(all[0].id, "202");
    assert_eq!(all.len(), 2);

    let testing = h
        .pilot
        .products(&ProductFilter {
            status: Some(ProductStatus::Testing),
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(testing.len(), 1);
    assert_eq!(testing[0].id, "101");

    let top = h
        .pilot
        .products(&ProductFilter {
            status: None,
            limit: Some(1),
        })
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn test_scores_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.db_path = dir.path().join("ledger.db").to_string_lossy().into_owned();

    {
        let pilot = ProductPilot::with_providers(
            &config,
            FakeLauncher::marketplace(),
            RecordingSink::new(),
            Arc::new(NoopAdvisor),
        )
        .unwrap();
        discover(&pilot).await;
        pilot.record_metrics("101", &snapshot(4, 9, 0)).await.unwrap();
        pilot.shutdown().await;
    }

    let h = setup_full(|c| c.db_path = config.db_path.clone(), Arc::new(NoopAdvisor), RecordingSink::new());
    let product = h.pilot.product("101").await.unwrap().unwrap();
    assert_eq!(product.status, ProductStatus::Active);
    // alpha = 5, beta = 6
    assert_eq!(product.score.mean_probability, 45.45);

    let again = h.pilot.record_metrics("101", &snapshot(1, 1, 0)).await.unwrap();
    assert_eq!(again.metrics.totals.sales, 5);
    assert_eq!(again.metrics.totals.clicks, 10);
}

#[tokio::test]
async fn test_counter_overflow_saturates_and_ledger_stays_readable() {
    let h = setup();
    discover(&h.pilot).await;

    let huge = MetricsSnapshot {
        clicks: u64::MAX,
        ..Default::default()
    };
    let first = h.pilot.record_metrics("101", &huge).await.unwrap();
    assert_eq!(first.metrics.totals.clicks, i64::MAX as u64);

    let second = h.pilot.record_metrics("101", &snapshot(0, 1, 0)).await.unwrap();
    assert_eq!(second.metrics.totals.clicks, i64::MAX as u64);
    assert!(second.score.mean_probability > 0.0);

    let rescored = h.pilot.rescore("101").await.unwrap();
    assert_eq!(rescored.metrics.totals.clicks, i64::MAX as u64);
    assert_eq!(rescored.status, second.status);

    let stored = h.pilot.product("101").await.unwrap().unwrap();
    assert_eq!(stored.status, second.status);
    assert_eq!(stored.score.mean_probability, second.score.mean_probability);
}
