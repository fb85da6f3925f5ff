//! Schema migration as an opaque, pluggable capability.
//!
//! The orchestrator only needs "upgrade to latest" and "is the schema
//! actually there" from whatever tool owns the schema. Production uses the
//! sqlx migrator with migrations embedded at compile time; tests substitute
//! doubles.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::{BootstrapError, Result};

/// Capability to bring persisted schema to the latest known revision.
///
/// `apply_migrations` is all-or-nothing from the orchestrator's point of
/// view and must be idempotent: invoking it against an already-current
/// schema is a successful no-op. Rollback, if any, belongs to the tool
/// behind the implementation, not to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaMigrator: Send + Sync {
    /// Upgrade the schema to the latest revision.
    async fn apply_migrations(&self) -> Result<()>;

    /// Cheap schema-presence check run after migrations.
    async fn verify_schema(&self) -> Result<()>;
}

/// Production migrator backed by sqlx's embedded migrations.
#[derive(Debug, Clone)]
pub struct SqlxMigrator {
    pool: PgPool,
}

impl SqlxMigrator {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaMigrator for SqlxMigrator {
    async fn apply_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| BootstrapError::Migration {
                output: err.to_string(),
            })
    }

    async fn verify_schema(&self) -> Result<()> {
        let row = sqlx::query("SELECT to_regclass('public.users')::text")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                BootstrapError::SchemaVerification(err.to_string())
            })?;

        let table: Option<String> = row.try_get(0).map_err(|err| {
            BootstrapError::SchemaVerification(err.to_string())
        })?;
        if table.is_none() {
            return Err(BootstrapError::SchemaVerification(
                "users table missing after migrations".into(),
            ));
        }
        Ok(())
    }
}
