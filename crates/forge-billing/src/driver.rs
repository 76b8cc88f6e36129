//! Infrastructure driver

use async_trait::async_trait;
use forge_tenant::Resource;
use std::time::Duration;
use thiserror::Error;

/// Infrastructure failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// The action did not complete
    #[error("driver failed for {resource}: {message}")]
    Failed {
        /// Resource id
        resource: String,
        /// Driver-specific detail
        message: String,
    },
}

/// Downstream infrastructure action for a resource
#[async_trait]
pub trait ResourceDriver: Send + Sync {
    /// Bring the resource's infrastructure up
    async fn start(&self, resource: &Resource) -> Result<(), DriverError>;

    /// Take the resource's infrastructure down, keeping its data
    async fn suspend(&self, resource: &Resource) -> Result<(), DriverError>;
}

/// Driver that only waits, standing in for real infrastructure
pub struct LocalDriver {
    delay: Duration,
}

impl LocalDriver {
    /// Driver finishing every action after `delay`
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for LocalDriver {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl ResourceDriver for LocalDriver {
    async fn start(&self, resource: &Resource) -> Result<(), DriverError> {
        tokio::time::sleep(self.delay).await;
        tracing::debug!(resource = %resource.id, "started");
        Ok(())
    }

    async fn suspend(&self, resource: &Resource) -> Result<(), DriverError> {
        tokio::time::sleep(self.delay).await;
        tracing::debug!(resource = %resource.id, "suspended");
        Ok(())
    }
}
