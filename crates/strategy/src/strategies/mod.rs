//! Concrete strategy types.

pub mod bollinger;
pub mod divergence;
pub mod hidden_divergence;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use bollinger::BollingerBandStrategy;
pub use divergence::DivergenceStrategy;
pub use hidden_divergence::HiddenDivergenceStrategy;
pub use macd::MacdStrategy;
pub use moving_average::MovingAverageStrategy;
pub use rsi::RsiStrategy;

use std::collections::HashMap;

use crate::StrategyError;

pub(crate) type Params = HashMap<String, toml::Value>;

/// Reject parameter keys a strategy does not understand.
pub(crate) fn check_known(params: &Params, known: &[&str]) -> Result<(), StrategyError> {
    let mut unknown: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|k| !known.contains(k))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(StrategyError::InvalidParameter(format!(
        "unknown parameter(s): {}",
        unknown.join(", ")
    )))
}

pub(crate) fn param_f64(params: &Params, key: &str, default: f64) -> Result<f64, StrategyError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_float()
            .or_else(|| v.as_integer().map(|i| i as f64))
            .ok_or_else(|| StrategyError::InvalidParameter(format!("'{key}' must be a number"))),
    }
}

pub(crate) fn param_usize(params: &Params, key: &str, default: usize) -> Result<usize, StrategyError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| {
                StrategyError::InvalidParameter(format!("'{key}' must be a non-negative integer"))
            }),
    }
}

/// Fraction of `fired` out of `total` conditions.
pub(crate) fn fraction(fired: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        fired as f64 / total as f64
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};
    use common::Bar;

    /// Bars with the given closes; high/low one unit around the close.
    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 21, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                time: start + Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1_000.0,
            })
            .collect()
    }
}
