use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;
use url::Url;

use common::{Error, Notifier, Result};

use crate::{chunk_message, webhook_client};

/// Discord rejects message content over this many characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Posts to a Discord channel webhook.
pub struct DiscordNotifier {
    http: Client,
    webhook: Url,
}

impl DiscordNotifier {
    pub fn new(webhook: Url) -> Result<Self> {
        Ok(Self { http: webhook_client()?, webhook })
    }
}

fn payloads(message: &str) -> Vec<serde_json::Value> {
    chunk_message(message, MAX_MESSAGE_CHARS)
        .into_iter()
        .map(|content| json!({ "content": content }))
        .collect()
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, message: &str) -> Result<()> {
        for payload in payloads(message) {
            let resp = self
                .http
                .post(self.webhook.clone())
                .json(&payload)
                .send()
                .await
                .map_err(|e| Error::NotificationFailure(format!("discord: {e}")))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(Error::NotificationFailure(format!("discord: HTTP {status}")));
            }
            debug!(status = %status, "Discord chunk delivered");
        }
        Ok(())
    }
}
