use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::HealthCheck;

/// Relational-store health check: a `SELECT 1` round trip.
///
/// The pool is expected to be built with lazy connections so that each ping
/// drives an actual connection attempt while the database is still coming
/// up.
#[derive(Debug, Clone)]
pub struct PostgresHealth {
    pool: PgPool,
}

impl PostgresHealth {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PostgresHealth {
    async fn ping(&self) -> anyhow::Result<()> {
        let row = sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        let value: i32 = row.try_get(0)?;
        anyhow::ensure!(value == 1, "unexpected SELECT 1 result: {value}");
        Ok(())
    }
}
