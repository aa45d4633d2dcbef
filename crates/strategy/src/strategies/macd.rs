use common::{Action, Bar, Signal};

use super::{check_known, param_usize, Params};
use crate::indicators::{Crossover, MacdIndicator};
use crate::{closes, ensure_lookback, Strategy, StrategyError};

/// Trades MACD/signal-line crossovers on the latest bar.
pub struct MacdStrategy {
    name: String,
    indicator: MacdIndicator,
}

impl MacdStrategy {
    pub const TYPE: &'static str = "macd";
    pub const PARAMS: &'static [&'static str] = &["fast", "slow", "signal"];

    pub fn new(name: impl Into<String>, indicator: MacdIndicator) -> Self {
        Self { name: name.into(), indicator }
    }

    pub fn from_params(name: impl Into<String>, params: &Params) -> Result<Self, StrategyError> {
        check_known(params, Self::PARAMS)?;
        let indicator = MacdIndicator::new(
            param_usize(params, "fast", 12)?,
            param_usize(params, "slow", 26)?,
            param_usize(params, "signal", 9)?,
        )?;
        Ok(Self::new(name, indicator))
    }
}

impl Default for MacdStrategy {
    fn default() -> Self {
        Self::new(Self::TYPE, MacdIndicator { fast: 12, slow: 26, signal: 9 })
    }
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_lookback(&self) -> usize {
        self.indicator.slow + self.indicator.signal
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Signal, StrategyError> {
        ensure_lookback(self.min_lookback(), bars)?;
        let cross = self
            .indicator
            .compute(&closes(bars))
            .ok_or_else(|| StrategyError::Other("MACD warm-up incomplete".into()))?;

        let (action, strength, rationale) = match cross {
            Crossover::Bullish => (Action::Buy, 1.0, "MACD crossed above signal"),
            Crossover::Bearish => (Action::Sell, 1.0, "MACD crossed below signal"),
            Crossover::Neutral => (Action::Hold, 0.5, "no MACD crossover"),
        };
        Ok(Signal::new(&self.name, symbol, action, strength, bars[bars.len() - 1].time)
            .with_rationale(rationale))
    }
}
