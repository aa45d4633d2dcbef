use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

use common::{Error, Notifier, Result};

use crate::webhook_client;

/// Posts to a Slack incoming webhook.
pub struct SlackNotifier {
    http: Client,
    webhook: Url,
}

impl SlackNotifier {
    pub fn new(webhook: Url) -> Result<Self> {
        Ok(Self { http: webhook_client()?, webhook })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.webhook.clone())
            .json(&json!({ "text": message }))
            .send()
            .await
            .map_err(|e| Error::NotificationFailure(format!("slack: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::NotificationFailure(format!("slack: HTTP {status}: {body}")));
        }
        Ok(())
    }
}
