use async_trait::async_trait;

use crate::{Bar, Result};

/// Source of historical daily bars.
///
/// Implementations return bars oldest first. Retries, if any, live inside
/// the implementation; callers treat every `Err` as final for the run.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetch up to `lookback` of the most recent daily bars for `symbol`.
    async fn fetch(&self, symbol: &str, lookback: usize) -> Result<Vec<Bar>>;
}
