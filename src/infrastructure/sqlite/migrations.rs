use crate::domain::error::DomainError;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            niche TEXT NOT NULL,
            url TEXT,
            status TEXT NOT NULL DEFAULT 'testing',
            first_seen_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_metrics (
            product_id TEXT PRIMARY KEY REFERENCES products(id),
            sales INTEGER NOT NULL DEFAULT 0,
            clicks INTEGER NOT NULL DEFAULT 0,
            social_engagement INTEGER NOT NULL DEFAULT 0,
            refund_count INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_scores (
            product_id TEXT PRIMARY KEY REFERENCES products(id),
            mean_probability REAL NOT NULL DEFAULT 50.0,
            computed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_products_status ON products(status);
        CREATE INDEX IF NOT EXISTS idx_products_niche ON products(niche);
        "
    ).map_err(|e| DomainError::Database(format!("Migration failed: {e}")))
}
