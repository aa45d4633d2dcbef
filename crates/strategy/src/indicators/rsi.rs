use crate::StrategyError;

/// RSI (Relative Strength Index) indicator.
///
/// Uses Wilder's smoothed moving average (same as TradingView / standard RSI).
/// Produces no value until at least `period + 1` closes are available.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl RsiIndicator {
    pub fn new(period: usize, overbought: f64, oversold: f64) -> Result<Self, StrategyError> {
        if period < 2 {
            return Err(StrategyError::InvalidParameter(format!(
                "RSI period must be >= 2, got {period}"
            )));
        }
        if !(0.0 < oversold && oversold < overbought && overbought < 100.0) {
            return Err(StrategyError::InvalidParameter(format!(
                "RSI thresholds must satisfy 0 < oversold < overbought < 100, got {oversold}/{overbought}"
            )));
        }
        Ok(Self { period, overbought, oversold })
    }

    /// Bars needed before the first value appears.
    pub fn warmup(&self) -> usize {
        self.period + 1
    }

    /// RSI of the latest close, oldest first input.
    /// Returns `None` if there are fewer than `period + 1` values.
    pub fn compute(&self, closes: &[f64]) -> Option<f64> {
        self.series(closes).last().copied().flatten()
    }

    /// RSI for every close, aligned with `closes`.
    pub fn series(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let mut out = vec![None; closes.len()];
        if closes.len() < self.period + 1 {
            return out;
        }

        // First average gain/loss over the initial `period` changes
        let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let initial = &changes[..self.period];

        let mut avg_gain = initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / self.period as f64;
        let mut avg_loss = initial.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>()
            / self.period as f64;
        out[self.period] = Some(rsi_value(avg_gain, avg_loss));

        // Wilder smoothing over remaining changes
        for (offset, &change) in changes[self.period..].iter().enumerate() {
            let gain = if change > 0.0 { change } else { 0.0 };
            let loss = if change < 0.0 { change.abs() } else { 0.0 };
            avg_gain = (avg_gain * (self.period - 1) as f64 + gain) / self.period as f64;
            avg_loss = (avg_loss * (self.period - 1) as f64 + loss) / self.period as f64;
            out[self.period + 1 + offset] = Some(rsi_value(avg_gain, avg_loss));
        }
        out
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        return 50.0; // no movement at all
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
