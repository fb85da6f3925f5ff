//! Error taxonomy for the bootstrap run.

use std::time::Duration;

use thiserror::Error;

/// Failures that end a bootstrap run.
///
/// Every variant is fatal: the orchestrator never retries across a stage
/// boundary. The only retry loop in the crate is the bounded polling inside
/// [`crate::probe::wait_until_ready`], and its exhaustion surfaces here as
/// [`BootstrapError::Timeout`].
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A dependency never reported healthy within its deadline.
    #[error("dependency '{target}' not ready after {elapsed:?}")]
    Timeout {
        /// Name of the dependency target that timed out.
        target: String,
        /// Wall-clock time spent polling before giving up.
        elapsed: Duration,
    },

    /// The migration tool reported failure.
    #[error("migration failed: {output}")]
    Migration {
        /// Output captured from the migration tool.
        output: String,
    },

    /// The schema-presence verification after migrations failed.
    #[error("schema verification failed: {0}")]
    SchemaVerification(String),

    /// A seed store could not ensure its baseline data.
    #[error("seeding failed: {0:#}")]
    Seed(anyhow::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BootstrapError>;
