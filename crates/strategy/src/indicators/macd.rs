use super::moving_average::{ema, ema_opt};
use super::Crossover;
use crate::StrategyError;

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period).
/// Crossover events are reported when the MACD line crosses the signal line.
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// MACD and signal lines aligned with the input closes.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, StrategyError> {
        if fast == 0 || signal == 0 {
            return Err(StrategyError::InvalidParameter(
                "MACD periods must be positive".into(),
            ));
        }
        if fast >= slow {
            return Err(StrategyError::InvalidParameter(format!(
                "MACD fast period must be less than slow period, got {fast}/{slow}"
            )));
        }
        Ok(Self { fast, slow, signal })
    }

    /// Closes needed before the MACD line has a value.
    pub fn line_warmup(&self) -> usize {
        self.slow
    }

    /// Closes needed before the signal line has a value.
    pub fn signal_warmup(&self) -> usize {
        self.slow + self.signal - 1
    }

    pub fn series(&self, closes: &[f64]) -> MacdSeries {
        let fast = ema(closes, self.fast);
        let slow = ema(closes, self.slow);
        let macd: Vec<Option<f64>> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| Some((*f)? - (*s)?))
            .collect();
        let signal = ema_opt(&macd, self.signal);
        MacdSeries { macd, signal }
    }

    /// Crossover of the MACD line against the signal line on the latest close.
    /// Returns `None` if there isn't enough data; needs `slow + signal` closes.
    pub fn compute(&self, closes: &[f64]) -> Option<Crossover> {
        if closes.len() < self.slow + self.signal {
            return None;
        }
        let series = self.series(closes);
        Crossover::latest(&series.macd, &series.signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_up(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    #[test]
    fn macd_returns_none_with_insufficient_data() {
        let macd = MacdIndicator::new(12, 26, 9).unwrap();
        let prices = vec![100.0; 30]; // need >= 35
        assert!(macd.compute(&prices).is_none());
    }

    #[test]
    fn macd_returns_some_with_sufficient_data() {
        let macd = MacdIndicator::new(12, 26, 9).unwrap();
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert!(macd.compute(&prices).is_some());
    }

    #[test]
    fn series_warmups_match() {
        let macd = MacdIndicator::new(3, 6, 3).unwrap();
        let series = macd.series(&trending_up(20));
        assert!(series.macd[..5].iter().all(Option::is_none));
        assert!(series.macd[5].is_some());
        assert!(series.signal[..7].iter().all(Option::is_none));
        assert!(series.signal[7].is_some());
        assert_eq!(macd.signal_warmup(), 8);
    }

    #[test]
    fn macd_detects_bullish_crossover_after_reversal() {
        let macd = MacdIndicator::new(3, 6, 3).unwrap();
        // Flat, then a decline that drags MACD under its signal line, then a sharp jump
        let mut prices = vec![100.0; 10];
        prices.extend((1..=8).map(|i| 100.0 - i as f64));
        prices.push(120.0);
        assert_eq!(macd.compute(&prices), Some(Crossover::Bullish));
    }

    #[test]
    fn macd_detects_bearish_crossover_after_reversal() {
        let macd = MacdIndicator::new(3, 6, 3).unwrap();
        let mut prices = vec![100.0; 10];
        prices.extend((1..=8).map(|i| 100.0 + i as f64));
        prices.push(80.0);
        assert_eq!(macd.compute(&prices), Some(Crossover::Bearish));
    }

    #[test]
    fn macd_neutral_on_steady_trend() {
        let macd = MacdIndicator::new(3, 6, 3).unwrap();
        // An accelerating up-trend keeps MACD above its signal line without crossing
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + 0.05 * (i * i) as f64).collect();
        assert_eq!(macd.compute(&prices), Some(Crossover::Neutral));
    }

    #[test]
    fn invalid_periods_rejected() {
        assert!(MacdIndicator::new(26, 12, 9).is_err());
        assert!(MacdIndicator::new(0, 12, 9).is_err());
        assert!(MacdIndicator::new(12, 26, 0).is_err());
    }
}
