use common::{Action, Bar, Signal};

use super::{check_known, fraction, param_usize, Params};
use crate::indicators::{last_two, MacdIndicator, RsiIndicator, Stochastic};
use crate::{closes, ensure_lookback, Strategy, StrategyError};

const CONDITIONS: usize = 3;

/// Regular divergence between the last close and RSI / MACD / KDJ momentum.
///
/// A falling close while at least two oscillators turn up from weak levels
/// reads as exhaustion of sellers (BUY); the mirror image reads as SELL.
pub struct DivergenceStrategy {
    name: String,
    rsi: RsiIndicator,
    macd: MacdIndicator,
    kdj: Stochastic,
}

impl DivergenceStrategy {
    pub const TYPE: &'static str = "divergence";
    pub const PARAMS: &'static [&'static str] = &[
        "rsi_period",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "kdj_k_period",
        "kdj_slow_k",
        "kdj_slow_d",
    ];

    pub fn new(
        name: impl Into<String>,
        rsi: RsiIndicator,
        macd: MacdIndicator,
        kdj: Stochastic,
    ) -> Self {
        Self { name: name.into(), rsi, macd, kdj }
    }

    pub fn from_params(name: impl Into<String>, params: &Params) -> Result<Self, StrategyError> {
        check_known(params, Self::PARAMS)?;
        let rsi = RsiIndicator::new(param_usize(params, "rsi_period", 14)?, 70.0, 30.0)?;
        let macd = MacdIndicator::new(
            param_usize(params, "macd_fast", 12)?,
            param_usize(params, "macd_slow", 26)?,
            param_usize(params, "macd_signal", 9)?,
        )?;
        let kdj = Stochastic::new(
            param_usize(params, "kdj_k_period", 14)?,
            param_usize(params, "kdj_slow_k", 3)?,
            param_usize(params, "kdj_slow_d", 3)?,
        )?;
        Ok(Self::new(name, rsi, macd, kdj))
    }
}

impl Default for DivergenceStrategy {
    fn default() -> Self {
        Self::new(
            Self::TYPE,
            RsiIndicator { period: 14, overbought: 70.0, oversold: 30.0 },
            MacdIndicator { fast: 12, slow: 26, signal: 9 },
            Stochastic { k_period: 14, slow_k: 3, slow_d: 3 },
        )
    }
}

impl Strategy for DivergenceStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_lookback(&self) -> usize {
        // Two points of every oscillator.
        (self.rsi.warmup() + 1)
            .max(self.macd.line_warmup() + 1)
            .max(self.kdj.warmup() + 1)
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Signal, StrategyError> {
        ensure_lookback(self.min_lookback(), bars)?;
        let closes = closes(bars);
        let n = closes.len();
        let (prev_close, close) = (closes[n - 2], closes[n - 1]);

        let missing = || StrategyError::Other("indicator warm-up incomplete".into());
        let (prev_rsi, rsi) = last_two(&self.rsi.series(&closes)).ok_or_else(missing)?;
        let (prev_macd, macd) = last_two(&self.macd.series(&closes).macd).ok_or_else(missing)?;
        let j: Vec<Option<f64>> = self.kdj.series(bars).iter().map(|v| v.map(|k| k.j)).collect();
        let (prev_j, j) = last_two(&j).ok_or_else(missing)?;

        let mut reasons = Vec::new();
        let mut candidate = Action::Hold;
        if close < prev_close {
            candidate = Action::Buy;
            if rsi > prev_rsi && rsi < 40.0 {
                reasons.push("bullish RSI divergence");
            }
            if macd > prev_macd && macd < 0.0 {
                reasons.push("bullish MACD divergence");
            }
            if j > prev_j && j < 20.0 {
                reasons.push("bullish KDJ divergence");
            }
        } else if close > prev_close {
            candidate = Action::Sell;
            if rsi < prev_rsi && rsi > 60.0 {
                reasons.push("bearish RSI divergence");
            }
            if macd < prev_macd && macd > 0.0 {
                reasons.push("bearish MACD divergence");
            }
            if j < prev_j && j > 80.0 {
                reasons.push("bearish KDJ divergence");
            }
        }

        let confirmed = fraction(reasons.len(), CONDITIONS);
        let (action, strength) = if reasons.len() >= 2 {
            (candidate, confirmed)
        } else {
            (Action::Hold, 1.0 - confirmed)
        };
        let rationale = if reasons.is_empty() {
            "no divergence detected".to_string()
        } else {
            reasons.join("; ")
        };

        Ok(Signal::new(&self.name, symbol, action, strength, bars[n - 1].time).with_rationale(rationale))
    }
}
