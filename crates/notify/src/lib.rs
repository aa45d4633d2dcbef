pub mod discord;
pub mod slack;
pub mod telegram;

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use common::{Error, Notifier, NotifierConfig, Result};

/// One notifier per configured backend. An empty config yields an empty list.
pub fn build_notifiers(cfg: &NotifierConfig) -> Result<Vec<Arc<dyn Notifier>>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(url) = &cfg.discord_webhook {
        notifiers.push(Arc::new(DiscordNotifier::new(url.clone())?));
    }
    if let Some(url) = &cfg.slack_webhook {
        notifiers.push(Arc::new(SlackNotifier::new(url.clone())?));
    }
    if let Some(telegram) = &cfg.telegram {
        notifiers.push(Arc::new(TelegramNotifier::new(telegram)));
    }
    for notifier in &notifiers {
        info!(notifier = %notifier.name(), "Notifier enabled");
    }
    Ok(notifiers)
}

pub(crate) fn webhook_client() -> Result<Client> {
    Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))
}

/// Split `text` into pieces of at most `max_chars` characters, breaking on
/// line ends where possible.
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    chunk_by(text, max_chars, |_| 1)
}

/// Same as [`chunk_message`], but the limit counts UTF-16 code units, which is
/// how Telegram measures message length.
pub fn chunk_message_utf16(text: &str, max_units: usize) -> Vec<String> {
    chunk_by(text, max_units, char::len_utf16)
}

fn chunk_by(text: &str, max_len: usize, measure: fn(char) -> usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len: usize = line.chars().map(measure).sum();
        if current_len + line_len > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= max_len {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        // A single line longer than the limit is cut at character boundaries.
        for c in line.chars() {
            let width = measure(c);
            if current_len + width > max_len && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(c);
            current_len += width;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
