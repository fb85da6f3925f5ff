use async_trait::async_trait;

use super::HealthCheck;

/// Cache health check: `PING` must answer exactly `PONG`.
///
/// A fresh multiplexed connection is opened per attempt; while the cache is
/// still starting, connection establishment itself is the failure we want to
/// observe and retry.
#[derive(Debug, Clone)]
pub struct RedisHealth {
    client: redis::Client,
}

impl RedisHealth {
    /// Build a health check for the given Redis URL.
    ///
    /// Fails only on a malformed URL; no connection is made here.
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthCheck for RedisHealth {
    async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        anyhow::ensure!(reply == "PONG", "unexpected PING reply: {reply}");
        Ok(())
    }
}
