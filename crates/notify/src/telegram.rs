use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::warn;

use common::{Error, Notifier, Result, TelegramConfig};

use crate::chunk_message_utf16;

/// Telegram's message limit, in UTF-16 code units.
pub const MAX_MESSAGE_UTF16: usize = 4096;

/// Sends the message to every configured chat.
///
/// Delivery continues past a failing chat; the send fails only if some chat
/// did not receive every chunk.
pub struct TelegramNotifier {
    bot: Bot,
    chat_ids: Vec<ChatId>,
}

impl TelegramNotifier {
    pub fn new(cfg: &TelegramConfig) -> Self {
        Self {
            bot: Bot::new(&cfg.token),
            chat_ids: cfg.chat_ids.iter().copied().map(ChatId).collect(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let chunks = chunk_message_utf16(message, MAX_MESSAGE_UTF16);
        let mut failed = Vec::new();
        for &chat_id in &self.chat_ids {
            for chunk in &chunks {
                if let Err(e) = self.bot.send_message(chat_id, chunk.as_str()).await {
                    warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram message");
                    failed.push(chat_id.0.to_string());
                    break;
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::NotificationFailure(format!(
                "telegram: delivery failed for chat(s) {}",
                failed.join(", ")
            )))
        }
    }
}
