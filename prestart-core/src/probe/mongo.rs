use async_trait::async_trait;
use mongodb::{Client, bson::doc};

use super::HealthCheck;

/// Document-store health check: the `ping` admin command.
#[derive(Debug, Clone)]
pub struct MongoHealth {
    client: Client,
}

impl MongoHealth {
    /// Wrap an existing client.
    ///
    /// The driver connects lazily; server selection happens on the first
    /// ping, which is exactly where we want failures surfaced.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthCheck for MongoHealth {
    async fn ping(&self) -> anyhow::Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}
