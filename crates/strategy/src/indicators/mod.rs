//! Technical indicators over daily bars.
//!
//! Series functions return one `Option<f64>` per input value, aligned by
//! index, with `None` during the warm-up period.

pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod stochastic;
pub mod volume;

pub use bollinger::{Band, BollingerBands};
pub use macd::{MacdIndicator, MacdSeries};
pub use moving_average::{ema, sma};
pub use rsi::RsiIndicator;
pub use stochastic::{Kdj, Stochastic};
pub use volume::volume_surge;

/// Direction of a two-line crossover on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Bullish, // fast line crossed above slow line
    Bearish, // fast line crossed below slow line
    Neutral, // no crossover on the latest bar
}

impl Crossover {
    /// Compare the previous and current values of two lines.
    pub fn detect(prev_fast: f64, prev_slow: f64, curr_fast: f64, curr_slow: f64) -> Self {
        if prev_fast <= prev_slow && curr_fast > curr_slow {
            Crossover::Bullish
        } else if prev_fast >= prev_slow && curr_fast < curr_slow {
            Crossover::Bearish
        } else {
            Crossover::Neutral
        }
    }

    /// Crossover over the last two points of two aligned series.
    /// `None` if either series lacks a value on either point.
    pub fn latest(fast: &[Option<f64>], slow: &[Option<f64>]) -> Option<Self> {
        let n = fast.len().min(slow.len());
        if n < 2 {
            return None;
        }
        Some(Self::detect(
            fast[n - 2]?,
            slow[n - 2]?,
            fast[n - 1]?,
            slow[n - 1]?,
        ))
    }
}

/// Last and second-to-last values of a series, if both are present.
pub fn last_two(series: &[Option<f64>]) -> Option<(f64, f64)> {
    let n = series.len();
    if n < 2 {
        return None;
    }
    Some((series[n - 2]?, series[n - 1]?))
}
