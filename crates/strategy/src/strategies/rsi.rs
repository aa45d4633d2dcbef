use common::{Action, Bar, Signal};

use super::{check_known, param_f64, param_usize, Params};
use crate::indicators::RsiIndicator;
use crate::{closes, ensure_lookback, Strategy, StrategyError};

/// Buys oversold and sells overbought RSI readings.
pub struct RsiStrategy {
    name: String,
    indicator: RsiIndicator,
}

impl RsiStrategy {
    pub const TYPE: &'static str = "rsi";
    pub const PARAMS: &'static [&'static str] = &["period", "overbought", "oversold"];

    pub fn new(name: impl Into<String>, indicator: RsiIndicator) -> Self {
        Self { name: name.into(), indicator }
    }

    pub fn from_params(name: impl Into<String>, params: &Params) -> Result<Self, StrategyError> {
        check_known(params, Self::PARAMS)?;
        let indicator = RsiIndicator::new(
            param_usize(params, "period", 14)?,
            param_f64(params, "overbought", 70.0)?,
            param_f64(params, "oversold", 30.0)?,
        )?;
        Ok(Self::new(name, indicator))
    }
}

impl Default for RsiStrategy {
    fn default() -> Self {
        Self::new(Self::TYPE, RsiIndicator { period: 14, overbought: 70.0, oversold: 30.0 })
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_lookback(&self) -> usize {
        self.indicator.warmup()
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Signal, StrategyError> {
        ensure_lookback(self.min_lookback(), bars)?;
        let rsi = self
            .indicator
            .compute(&closes(bars))
            .ok_or_else(|| StrategyError::Other("RSI warm-up incomplete".into()))?;
        let (oversold, overbought) = (self.indicator.oversold, self.indicator.overbought);

        // Strength grows with the distance past the threshold.
        let (action, strength) = if rsi <= oversold {
            (Action::Buy, 0.5 + 0.5 * (oversold - rsi) / oversold)
        } else if rsi >= overbought {
            (Action::Sell, 0.5 + 0.5 * (rsi - overbought) / (100.0 - overbought))
        } else {
            (Action::Hold, 1.0 - (rsi - 50.0).abs() / 50.0)
        };

        Ok(Signal::new(&self.name, symbol, action, strength, bars[bars.len() - 1].time)
            .with_rationale(format!("RSI({}) = {rsi:.1}", self.indicator.period)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::bars_from_closes;

    fn strategy() -> RsiStrategy {
        RsiStrategy::from_params("rsi", &Params::new()).unwrap()
    }

    #[test]
    fn falling_prices_are_oversold() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let signal = strategy().evaluate("AMD", &bars_from_closes(&closes)).unwrap();
        assert_eq!(signal.action(), Action::Buy);
        assert_eq!(signal.strength(), 1.0);
        assert_eq!(signal.rationale(), Some("RSI(14) = 0.0"));
    }

    #[test]
    fn rising_prices_are_overbought() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let signal = strategy().evaluate("AMD", &bars_from_closes(&closes)).unwrap();
        assert_eq!(signal.action(), Action::Sell);
    }

    #[test]
    fn flat_prices_hold_with_full_strength() {
        let signal = strategy().evaluate("AMD", &bars_from_closes(&[50.0; 20])).unwrap();
        assert_eq!(signal.action(), Action::Hold);
        assert_eq!(signal.strength(), 1.0);
    }

    #[test]
    fn needs_period_plus_one_bars() {
        let err = strategy().evaluate("AMD", &bars_from_closes(&[50.0; 14])).unwrap_err();
        assert_eq!(err, StrategyError::InsufficientData { required: 15, available: 14 });
    }
}
