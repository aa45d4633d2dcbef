use common::Bar;

use super::moving_average::sma_opt;
use crate::StrategyError;

/// Slow stochastic oscillator with the KDJ `J` line.
///
/// Raw %K over `k_period` bars, smoothed by `slow_k` into K, D = SMA(K, `slow_d`),
/// J = 3K − 2D.
#[derive(Debug, Clone)]
pub struct Stochastic {
    pub k_period: usize,
    pub slow_k: usize,
    pub slow_d: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kdj {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

impl Stochastic {
    pub fn new(k_period: usize, slow_k: usize, slow_d: usize) -> Result<Self, StrategyError> {
        if k_period == 0 || slow_k == 0 || slow_d == 0 {
            return Err(StrategyError::InvalidParameter(
                "stochastic periods must be positive".into(),
            ));
        }
        Ok(Self { k_period, slow_k, slow_d })
    }

    /// Bars needed before the first full K/D/J value.
    pub fn warmup(&self) -> usize {
        self.k_period + self.slow_k + self.slow_d - 2
    }

    pub fn series(&self, bars: &[Bar]) -> Vec<Option<Kdj>> {
        let mut raw_k = vec![None; bars.len()];
        if bars.len() >= self.k_period {
            for i in (self.k_period - 1)..bars.len() {
                let window = &bars[i + 1 - self.k_period..=i];
                let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
                let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
                let range = highest - lowest;
                raw_k[i] = Some(if range > 0.0 {
                    100.0 * (bars[i].close - lowest) / range
                } else {
                    50.0
                });
            }
        }

        let k = sma_opt(&raw_k, self.slow_k);
        let d = sma_opt(&k, self.slow_d);
        k.iter()
            .zip(&d)
            .map(|(k, d)| {
                let (k, d) = ((*k)?, (*d)?);
                Some(Kdj { k, d, j: 3.0 * k - 2.0 * d })
            })
            .collect()
    }
}
