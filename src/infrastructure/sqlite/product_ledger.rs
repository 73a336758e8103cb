use crate::domain::entities::product::{days_since, Product};
use crate::domain::error::DomainError;
use crate::domain::ports::product_ledger::{ProductFilter, ProductLedger, Scorer, ScoredMetrics};
use crate::domain::values::metrics::{LedgerMetrics, MetricsSnapshot};
use crate::domain::values::product_status::ProductStatus;
use crate::domain::values::scoring::ScoreState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.niche, p.url, p.status, p.first_seen_at, \
     COALESCE(s.mean_probability, 50.0), s.computed_at";

pub struct SqliteProductLedger {
    conn: Mutex<Connection>,
}

impl SqliteProductLedger {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DomainError> {
        self.conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))
    }

    fn row_to_product(row: &rusqlite::Row) -> Result<Product, rusqlite::Error> {
        let status_str: String = row.get(4)?;
        let first_seen_str: String = row.get(5)?;
        let computed_str: Option<String> = row.get(7)?;
        let first_seen_at = parse_timestamp(&first_seen_str);

        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            niche: row.get(2)?,
            url: row.get(3)?,
            status: status_str.parse().unwrap_or_else(|_| {
                tracing::warn!(status = %status_str, "invalid product status, defaulting to testing");
                ProductStatus::Testing
            }),
            score: ScoreState {
                mean_probability: row.get(6)?,
                computed_at: computed_str
                    .map(|s| parse_timestamp(&s))
                    .unwrap_or(first_seen_at),
            },
            first_seen_at,
        })
    }

    fn read_metrics(conn: &Connection, id: &str) -> Result<Option<LedgerMetrics>, DomainError> {
        let row = conn
            .query_row(
                "SELECT p.first_seen_at,
                        COALESCE(m.sales, 0), COALESCE(m.clicks, 0),
                        COALESCE(m.social_engagement, 0), COALESCE(m.refund_count, 0)
                 FROM products p
                 LEFT JOIN product_metrics m ON m.product_id = p.id
                 WHERE p.id = ?1",
                params![id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, i64>(2)?,
                        r.get::<_, i64>(3)?,
                        r.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(first_seen, sales, clicks, social, refunds)| LedgerMetrics {
            totals: MetricsSnapshot {
                sales: to_count(sales),
                clicks: to_count(clicks),
                social_engagement: to_count(social),
                refund_count: to_count(refunds),
            },
            days_active: days_since(parse_timestamp(&first_seen)),
        }))
    }

    fn store_score(
        conn: &Connection,
        id: &str,
        score: &ScoreState,
        status: ProductStatus,
    ) -> Result<(), DomainError> {
        let rows = conn.execute(
            "UPDATE products SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        if rows == 0 {
            return Err(DomainError::NotFound(format!("Product not found: {id}")));
        }
        conn.execute(
            "INSERT INTO product_scores (product_id, mean_probability, computed_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(product_id) DO UPDATE SET
                mean_probability = excluded.mean_probability,
                computed_at = excluded.computed_at",
            params![id, score.mean_probability, score.computed_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn to_count(v: i64) -> u64 {
    v.max(0) as u64
}

fn to_sql_count(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Largest counter SQLite can hold as an integer.
fn storable(v: u64) -> u64 {
    v.min(i64::MAX as u64)
}

#[async_trait]
impl ProductLedger for SqliteProductLedger {
    async fn insert_if_new(&self, product: &Product) -> Result<bool, DomainError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO products (id, name, niche, url, status, first_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    product.id,
                    product.name,
                    product.niche,
                    product.url,
                    product.status.to_string(),
                    product.first_seen_at.to_rfc3339(),
                ],
            )
            .map_err(|e| DomainError::Database(format!("Failed to insert product: {e}")))?;

        if inserted == 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO product_scores (product_id, mean_probability, computed_at) VALUES (?1, ?2, ?3)",
            params![
                product.id,
                product.score.mean_probability,
                product.score.computed_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, DomainError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             LEFT JOIN product_scores s ON s.product_id = p.id
             WHERE p.id = ?1"
        );
        let product = conn
            .query_row(&sql, params![id], Self::row_to_product)
            .optional()?;
        Ok(product)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, DomainError> {
        let conn = self.lock()?;
        let mut sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             LEFT JOIN product_scores s ON s.product_id = p.id
             WHERE 1=1"
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(&format!(" AND p.status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.to_string()));
        }
        sql.push_str(" ORDER BY COALESCE(s.mean_probability, 50.0) DESC, p.first_seen_at ASC, p.id ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT ?{}", param_values.len() + 1));
            param_values.push(Box::new(limit as i64));
        }

        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params_refs.as_slice(), Self::row_to_product)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    async fn record_metrics(
        &self,
        id: &str,
        snapshot: &MetricsSnapshot,
        scorer: &Scorer,
    ) -> Result<ScoredMetrics, DomainError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current = Self::read_metrics(&tx, id)?
            .ok_or_else(|| DomainError::NotFound(format!("Product not found: {id}")))?;

        let sum = current.totals.saturating_add(snapshot);
        let totals = MetricsSnapshot {
            sales: storable(sum.sales),
            clicks: storable(sum.clicks),
            social_engagement: storable(sum.social_engagement),
            refund_count: storable(sum.refund_count),
        };
        tx.execute(
            "INSERT INTO product_metrics (product_id, sales, clicks, social_engagement, refund_count, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(product_id) DO UPDATE SET
                sales = excluded.sales,
                clicks = excluded.clicks,
                social_engagement = excluded.social_engagement,
                refund_count = excluded.refund_count,
                updated_at = excluded.updated_at",
            params![
                id,
                to_sql_count(totals.sales),
                to_sql_count(totals.clicks),
                to_sql_count(totals.social_engagement),
                to_sql_count(totals.refund_count),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to record metrics: {e}")))?;

        let metrics = LedgerMetrics {
            totals,
            days_active: current.days_active,
        };
        let (score, status) = scorer(&metrics);
        Self::store_score(&tx, id, &score, status)?;
        tx.commit()
            .map_err(|e| DomainError::Database(format!("Failed to record metrics: {e}")))?;

        Ok(ScoredMetrics {
            metrics,
            score,
            status,
        })
    }

    async fn metrics(&self, id: &str) -> Result<Option<LedgerMetrics>, DomainError> {
        let conn = self.lock()?;
        Self::read_metrics(&conn, id)
    }

    async fn write_score(
        &self,
        id: &str,
        score: &ScoreState,
        status: ProductStatus,
    ) -> Result<(), DomainError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::store_score(&tx, id, score, status)?;
        tx.commit()
            .map_err(|e| DomainError::Database(format!("Failed to write score: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::scoring::decide_status;
    use crate::infrastructure::sqlite::migrations::run_migrations;

    fn ledger() -> SqliteProductLedger {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        SqliteProductLedger::new(conn)
    }

    fn product(id: &str) -> Product {
        Product::discovered(id.into(), format!("Course {id}"), "rust".into(), None)
    }

    fn score(m: &LedgerMetrics) -> (ScoreState, ProductStatus) {
        let t = m.totals;
        (
            ScoreState::compute(t.sales, t.clicks),
            decide_status(&t.status_metrics(), m.days_active),
        )
    }

    #[tokio::test]
    async fn test_insert_if_new_is_idempotent() {
        let ledger = ledger();
        assert!(ledger.insert_if_new(&product("a")).await.unwrap());
        assert!(!ledger.insert_if_new(&product("a")).await.unwrap());

        let stored = ledger.get_product("a").await.unwrap().unwrap();
        assert_eq!(stored.status, ProductStatus::Testing);
        assert_eq!(stored.score.mean_probability, 50.0);
    }

    #[tokio::test]
    async fn test_metrics_accumulate() {
        let ledger = ledger();
        ledger.insert_if_new(&product("a")).await.unwrap();
        let snap = MetricsSnapshot {
            sales: 2,
            clicks: 10,
            social_engagement: 4,
            refund_count: 1,
        };
        ledger.record_metrics("a", &snap, &score).await.unwrap();
        ledger.record_metrics("a", &snap, &score).await.unwrap();

        let m = ledger.metrics("a").await.unwrap().unwrap();
        assert_eq!(m.totals.sales, 4);
        assert_eq!(m.totals.clicks, 20);
        assert_eq!(m.totals.social_engagement, 8);
        assert_eq!(m.totals.refund_count, 2);
        assert_eq!(m.days_active, 0);
    }

    #[tokio::test]
    async fn test_metrics_for_unmeasured_product_are_zero() {
        let ledger = ledger();
        ledger.insert_if_new(&product("a")).await.unwrap();
        let m = ledger.metrics("a").await.unwrap().unwrap();
        assert_eq!(m.totals, MetricsSnapshot::default());
        assert!(ledger.metrics("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_metrics_unknown_product() {
        let ledger = ledger();
        let err = ledger
            .record_metrics("ghost", &MetricsSnapshot::default(), &score)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_metrics_writes_score_and_status() {
        let ledger = ledger();
        ledger.insert_if_new(&product("a")).await.unwrap();
        let snap = MetricsSnapshot {
            sales: 12,
            clicks: 60,
            ..Default::default()
        };
        let recorded = ledger.record_metrics("a", &snap, &score).await.unwrap();
        assert_eq!(recorded.status, ProductStatus::Scaling);

        let stored = ledger.get_product("a").await.unwrap().unwrap();
        assert_eq!(stored.status, ProductStatus::Scaling);
        assert_eq!(stored.score.mean_probability, recorded.score.mean_probability);
    }

    #[tokio::test]
    async fn test_counters_saturate_instead_of_overflowing() {
        let ledger = ledger();
        ledger.insert_if_new(&product("a")).await.unwrap();
        let huge = MetricsSnapshot {
            clicks: u64::MAX,
            ..Default::default()
        };
        let one = MetricsSnapshot {
            clicks: 1,
            ..Default::default()
        };
        ledger.record_metrics("a", &huge, &score).await.unwrap();
        let recorded = ledger.record_metrics("a", &one, &score).await.unwrap();
        assert_eq!(recorded.metrics.totals.clicks, i64::MAX as u64);

        // Still readable and writable afterwards.
        let m = ledger.metrics("a").await.unwrap().unwrap();
        assert_eq!(m.totals.clicks, i64::MAX as u64);
        ledger.record_metrics("a", &one, &score).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_score_updates_status_and_ordering() {
        let ledger = ledger();
        ledger.insert_if_new(&product("a")).await.unwrap();
        ledger.insert_if_new(&product("b")).await.unwrap();

        ledger
            .write_score("b", &ScoreState::compute(8, 10), ProductStatus::Active)
            .await
            .unwrap();

        let all = ledger.list_products(&ProductFilter::default()).await.unwrap();
        assert_eq!(all[0].id, "b");
        assert_eq!(all[0].status, ProductStatus::Active);

        let testing = ledger
            .list_products(&ProductFilter {
                status: Some(ProductStatus::Testing),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(testing.len(), 1);
        assert_eq!(testing[0].id, "a");
    }

    #[tokio::test]
    async fn test_write_score_unknown_product() {
        let ledger = ledger();
        let err = ledger
            .write_score("ghost", &ScoreState::initial(), ProductStatus::Killed)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
