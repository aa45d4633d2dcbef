use async_trait::async_trait;

use crate::Result;

/// Delivers a human-readable text message to an operator channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Backend name used in logs ("discord", "slack", ...).
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<()>;
}
