use common::{Action, Bar, Signal};

use super::{check_known, fraction, param_usize, Params};
use crate::indicators::{ema, MacdIndicator, RsiIndicator, Stochastic};
use crate::{closes, ensure_lookback, Strategy, StrategyError};

const CONDITIONS: usize = 3;

/// Hidden divergence against the last swing point.
///
/// In an uptrend (close above the EMA) a higher price than the latest swing low
/// paired with lower oscillator readings is hidden bearish and sells; in a
/// downtrend a lower price than the latest swing high with higher readings is
/// hidden bullish and buys. At least two of RSI, MACD and KDJ J must agree.
pub struct HiddenDivergenceStrategy {
    name: String,
    ema_period: usize,
    swing_window: usize,
    rsi: RsiIndicator,
    macd: MacdIndicator,
    kdj: Stochastic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
}

impl HiddenDivergenceStrategy {
    pub const TYPE: &'static str = "hidden_divergence";
    pub const PARAMS: &'static [&'static str] = &[
        "ema_period",
        "swing_window",
        "rsi_period",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "kdj_k_period",
        "kdj_slow_k",
        "kdj_slow_d",
    ];

    pub fn from_params(name: impl Into<String>, params: &Params) -> Result<Self, StrategyError> {
        check_known(params, Self::PARAMS)?;
        let ema_period = param_usize(params, "ema_period", 50)?;
        let swing_window = param_usize(params, "swing_window", 1)?;
        if ema_period == 0 || swing_window == 0 {
            return Err(StrategyError::InvalidParameter(
                "ema_period and swing_window must be positive".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            ema_period,
            swing_window,
            rsi: RsiIndicator::new(param_usize(params, "rsi_period", 14)?, 70.0, 30.0)?,
            macd: MacdIndicator::new(
                param_usize(params, "macd_fast", 12)?,
                param_usize(params, "macd_slow", 26)?,
                param_usize(params, "macd_signal", 9)?,
            )?,
            kdj: Stochastic::new(
                param_usize(params, "kdj_k_period", 14)?,
                param_usize(params, "kdj_slow_k", 3)?,
                param_usize(params, "kdj_slow_d", 3)?,
            )?,
        })
    }

    /// Index of the most recent strict swing low (`lows == true`) or swing high.
    fn last_swing(&self, bars: &[Bar], lows: bool) -> Option<usize> {
        let w = self.swing_window;
        if bars.len() < 2 * w + 1 {
            return None;
        }
        (w..bars.len() - w).rev().find(|&i| {
            (1..=w).all(|j| {
                if lows {
                    bars[i].low < bars[i - j].low && bars[i].low < bars[i + j].low
                } else {
                    bars[i].high > bars[i - j].high && bars[i].high > bars[i + j].high
                }
            })
        })
    }
}

impl Default for HiddenDivergenceStrategy {
    fn default() -> Self {
        Self {
            name: Self::TYPE.to_string(),
            ema_period: 50,
            swing_window: 1,
            rsi: RsiIndicator { period: 14, overbought: 70.0, oversold: 30.0 },
            macd: MacdIndicator { fast: 12, slow: 26, signal: 9 },
            kdj: Stochastic { k_period: 14, slow_k: 3, slow_d: 3 },
        }
    }
}

impl Strategy for HiddenDivergenceStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_lookback(&self) -> usize {
        self.ema_period
            .max(self.rsi.warmup())
            .max(self.macd.line_warmup())
            .max(self.kdj.warmup())
            .max(2 * self.swing_window + 2)
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Signal, StrategyError> {
        ensure_lookback(self.min_lookback(), bars)?;
        let closes = closes(bars);
        let last = closes.len() - 1;
        let as_of = bars[last].time;
        let close = closes[last];

        let trend_ema = ema(&closes, self.ema_period)[last]
            .ok_or_else(|| StrategyError::Other("EMA warm-up incomplete".into()))?;
        let trend = if close > trend_ema { Trend::Up } else { Trend::Down };

        let Some(swing) = self.last_swing(bars, trend == Trend::Up) else {
            return Ok(Signal::new(&self.name, symbol, Action::Hold, 1.0, as_of)
                .with_rationale("no valid swing point"));
        };
        let swing_close = closes[swing];

        let rsi = self.rsi.series(&closes);
        let macd = self.macd.series(&closes).macd;
        let j: Vec<Option<f64>> = self.kdj.series(bars).iter().map(|v| v.map(|k| k.j)).collect();

        // An indicator without a value at the swing cannot confirm anything.
        let readings = |series: &[Option<f64>]| Some((series[swing]?, series[last]?));
        let oscillators = [("RSI", rsi.as_slice()), ("MACD", macd.as_slice()), ("KDJ J", j.as_slice())];

        let mut reasons = Vec::new();
        let candidate = match trend {
            Trend::Up if close > swing_close => {
                for (label, series) in oscillators {
                    if matches!(readings(series), Some((then, now)) if now < then) {
                        reasons.push(format!("hidden bearish divergence: price higher, {label} lower"));
                    }
                }
                Action::Sell
            }
            Trend::Down if close < swing_close => {
                for (label, series) in oscillators {
                    if matches!(readings(series), Some((then, now)) if now > then) {
                        reasons.push(format!("hidden bullish divergence: price lower, {label} higher"));
                    }
                }
                Action::Buy
            }
            _ => Action::Hold,
        };

        let confirmed = fraction(reasons.len(), CONDITIONS);
        let (action, strength) = if reasons.len() >= 2 {
            (candidate, confirmed)
        } else {
            (Action::Hold, 1.0 - confirmed)
        };
        let rationale = if reasons.is_empty() {
            "no hidden divergence".to_string()
        } else {
            reasons.join("; ")
        };
        Ok(Signal::new(&self.name, symbol, action, strength, as_of).with_rationale(rationale))
    }
}
