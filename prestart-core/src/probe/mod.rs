//! Dependency readiness probes.
//!
//! Each external dependency (cache, relational store, document store) is
//! described by a [`DependencyTarget`] and polled through a [`HealthCheck`]
//! until it answers its native ping equivalent or the target's deadline is
//! exceeded. The polling loop is always bounded: exhausting the deadline
//! fails the whole bootstrap run instead of hanging the process.

mod mongo;
mod postgres;
mod redis;

pub use mongo::MongoHealth;
pub use postgres::PostgresHealth;
pub use redis::RedisHealth;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{info, warn};

use crate::error::{BootstrapError, Result};

/// One external dependency the process must be able to reach before it can
/// serve traffic.
///
/// Immutable once constructed; the orchestrator holds one per required
/// dependency.
#[derive(Debug, Clone)]
pub struct DependencyTarget {
    /// Human-readable name used in logs and timeout errors.
    pub name: String,
    /// Connection URL/DSN the health check dials.
    pub url: String,
    /// Sleep between failed attempts.
    pub poll_interval: Duration,
    /// Wall-clock deadline for the whole wait.
    pub max_wait: Duration,
}

impl DependencyTarget {
    /// Build a target with the given name and connection URL.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            poll_interval,
            max_wait,
        }
    }
}

/// One lightweight round trip against a dependency.
///
/// Implementations must be cheap enough to issue once per poll interval and
/// must only return `Ok` on the dependency's recognized ready signal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Issue a single health check; `Ok(())` means ready.
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Poll `check` at `target.poll_interval` until it reports ready or
/// `target.max_wait` has elapsed.
///
/// Emits one log line per attempt. Exceeding the deadline yields
/// [`BootstrapError::Timeout`] carrying the target name and elapsed time.
pub async fn wait_until_ready(
    target: &DependencyTarget,
    check: &dyn HealthCheck,
) -> Result<()> {
    let start = Instant::now();
    let deadline = start + target.max_wait;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        // Each attempt is capped at the remaining deadline: a black-holed
        // host that stalls instead of refusing must not outlive max_wait.
        match timeout_at(deadline, check.ping()).await {
            Ok(Ok(())) => {
                info!(
                    dependency = %target.name,
                    attempt,
                    elapsed = ?start.elapsed(),
                    "dependency ready"
                );
                return Ok(());
            }
            Ok(Err(err)) => {
                warn!(
                    dependency = %target.name,
                    attempt,
                    error = %err,
                    "dependency not ready yet"
                );
            }
            Err(_) => {
                warn!(
                    dependency = %target.name,
                    attempt,
                    "health check still pending at deadline"
                );
                return Err(BootstrapError::Timeout {
                    target: target.name.clone(),
                    elapsed: start.elapsed(),
                });
            }
        }

        if Instant::now() >= deadline {
            return Err(BootstrapError::Timeout {
                target: target.name.clone(),
                elapsed: start.elapsed(),
            });
        }
        sleep(target.poll_interval).await;
    }
}
