use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Price history could not be fetched, or came back empty/short.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// One strategy could not produce a signal. Never fatal to the symbol.
    #[error("strategy '{strategy}' failed: {reason}")]
    StrategyFailure { strategy: String, reason: String },

    /// No strategy produced a signal for the symbol.
    #[error("all strategies failed{}", fmt_details(.0))]
    AllStrategiesFailed(Vec<String>),

    #[error("execution failed: {0}")]
    ExecutionFailure(String),

    #[error("notification failed: {0}")]
    NotificationFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timeout")]
    Timeout,
}

fn fmt_details(details: &[String]) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(": {}", details.join("; "))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
