use common::{Action, Bar, Signal};

use super::{check_known, fraction, param_f64, param_usize, Params};
use crate::indicators::{ema, sma, volume_surge, Crossover, MacdIndicator, RsiIndicator};
use crate::{closes, ensure_lookback, Strategy, StrategyError};

const CONDITIONS: usize = 4;

/// EMA/SMA crossover confirmed by a MACD crossover, an RSI extreme and a
/// volume surge. All four must agree before it trades.
///
/// The side of 50 RSI sits on is reported in the rationale but does not gate.
pub struct MovingAverageStrategy {
    name: String,
    ema_period: usize,
    sma_period: usize,
    rsi: RsiIndicator,
    macd: MacdIndicator,
    volume_window: usize,
    volume_factor: f64,
}

impl MovingAverageStrategy {
    pub const TYPE: &'static str = "moving_average";
    pub const PARAMS: &'static [&'static str] = &[
        "ema_period",
        "sma_period",
        "rsi_period",
        "overbought",
        "oversold",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "volume_window",
        "volume_factor",
    ];

    pub fn from_params(name: impl Into<String>, params: &Params) -> Result<Self, StrategyError> {
        check_known(params, Self::PARAMS)?;
        let ema_period = param_usize(params, "ema_period", 10)?;
        let sma_period = param_usize(params, "sma_period", 20)?;
        if ema_period == 0 || ema_period >= sma_period {
            return Err(StrategyError::InvalidParameter(format!(
                "EMA period must be positive and shorter than SMA period, got {ema_period}/{sma_period}"
            )));
        }
        let volume_window = param_usize(params, "volume_window", 5)?;
        let volume_factor = param_f64(params, "volume_factor", 1.2)?;
        if volume_window == 0 || volume_factor.is_nan() || volume_factor <= 0.0 {
            return Err(StrategyError::InvalidParameter(
                "volume_window and volume_factor must be positive".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            ema_period,
            sma_period,
            rsi: RsiIndicator::new(
                param_usize(params, "rsi_period", 14)?,
                param_f64(params, "overbought", 70.0)?,
                param_f64(params, "oversold", 30.0)?,
            )?,
            macd: MacdIndicator::new(
                param_usize(params, "macd_fast", 12)?,
                param_usize(params, "macd_slow", 26)?,
                param_usize(params, "macd_signal", 9)?,
            )?,
            volume_window,
            volume_factor,
        })
    }
}

impl Default for MovingAverageStrategy {
    fn default() -> Self {
        Self {
            name: Self::TYPE.to_string(),
            ema_period: 10,
            sma_period: 20,
            rsi: RsiIndicator { period: 14, overbought: 70.0, oversold: 30.0 },
            macd: MacdIndicator { fast: 12, slow: 26, signal: 9 },
            volume_window: 5,
            volume_factor: 1.2,
        }
    }
}

impl Strategy for MovingAverageStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_lookback(&self) -> usize {
        (self.sma_period + 1)
            .max(self.ema_period + 1)
            .max(self.macd.signal_warmup() + 1)
            .max(self.rsi.warmup())
            .max(self.volume_window + 1)
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Signal, StrategyError> {
        ensure_lookback(self.min_lookback(), bars)?;
        let closes = closes(bars);
        let as_of = bars[bars.len() - 1].time;

        let ma_cross = Crossover::latest(&ema(&closes, self.ema_period), &sma(&closes, self.sma_period));
        let macd = self.macd.series(&closes);
        let macd_cross = Crossover::latest(&macd.macd, &macd.signal);
        let rsi = self.rsi.compute(&closes);
        let surge = volume_surge(bars, self.volume_window, self.volume_factor).unwrap_or(false);

        let bullish = [
            (ma_cross == Some(Crossover::Bullish), "EMA crossed above SMA"),
            (macd_cross == Some(Crossover::Bullish), "MACD bullish crossover"),
            (rsi.is_some_and(|v| v < self.rsi.oversold), "RSI oversold"),
            (surge, "volume surge"),
        ];
        let bearish = [
            (ma_cross == Some(Crossover::Bearish), "EMA crossed below SMA"),
            (macd_cross == Some(Crossover::Bearish), "MACD bearish crossover"),
            (rsi.is_some_and(|v| v > self.rsi.overbought), "RSI overbought"),
            (surge, "volume surge"),
        ];
        let fired = |conditions: &[(bool, &'static str)]| -> Vec<&'static str> {
            conditions.iter().filter(|(hit, _)| *hit).map(|(_, label)| *label).collect()
        };
        let (bull, bear) = (fired(&bullish), fired(&bearish));

        let (action, strength, mut reasons, bullish_side) = if bull.len() == CONDITIONS {
            (Action::Buy, 1.0, bull, true)
        } else if bear.len() == CONDITIONS {
            (Action::Sell, 1.0, bear, false)
        } else {
            let best = bull.len().max(bear.len());
            let bullish_side = bull.len() >= bear.len();
            let reasons = if bullish_side { bull } else { bear };
            (Action::Hold, 1.0 - fraction(best, CONDITIONS), reasons, bullish_side)
        };
        match rsi {
            Some(v) if bullish_side && v > 50.0 => reasons.push("RSI above 50"),
            Some(v) if !bullish_side && v < 50.0 => reasons.push("RSI below 50"),
            _ => {}
        }
        let rationale = if reasons.is_empty() {
            "no confirmation".to_string()
        } else {
            reasons.join("; ")
        };
        Ok(Signal::new(&self.name, symbol, action, strength, as_of).with_rationale(rationale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::bars_from_closes;

    /// Flat, a ten-bar drift, then a reversal bar through both averages.
    fn reversal(drift: f64, last: f64, last_volume: f64) -> Vec<Bar> {
        let mut closes = vec![100.0; 30];
        closes.extend((1..=10).map(|i| 100.0 + drift * i as f64));
        closes.push(last);
        let mut bars = bars_from_closes(&closes);
        if let Some(bar) = bars.last_mut() {
            bar.volume = last_volume;
        }
        bars
    }

    fn with_thresholds(overbought: f64, oversold: f64) -> MovingAverageStrategy {
        let mut params = Params::new();
        params.insert("overbought".into(), toml::Value::Float(overbought));
        params.insert("oversold".into(), toml::Value::Float(oversold));
        MovingAverageStrategy::from_params("ma", &params).unwrap()
    }

    #[test]
    fn crosses_and_surge_above_midline_rsi_hold() {
        let closes = [
            vec![100.0; 30],
            vec![99.5, 99.0, 98.5, 99.0, 99.5, 100.0, 100.5, 101.0, 98.0, 101.0],
        ]
        .concat();
        let mut bars = bars_from_closes(&closes);
        if let Some(bar) = bars.last_mut() {
            bar.volume = 2_000.0;
        }
        let rsi = RsiIndicator { period: 14, overbought: 70.0, oversold: 30.0 }
            .compute(&closes)
            .unwrap();
        assert!(rsi > 50.0 && rsi < 70.0, "rsi {rsi}");

        let signal = MovingAverageStrategy::default().evaluate("NVDA", &bars).unwrap();
        assert_eq!(signal.action(), Action::Hold);
        assert!((signal.strength() - 0.25).abs() < 1e-9);
        assert_eq!(
            signal.rationale(),
            Some("EMA crossed above SMA; MACD bullish crossover; volume surge; RSI above 50")
        );
    }

    #[test]
    fn reversal_inside_oversold_band_buys() {
        let signal = with_thresholds(95.0, 90.0)
            .evaluate("NVDA", &reversal(-1.0, 125.0, 2_000.0))
            .unwrap();
        assert_eq!(signal.action(), Action::Buy, "{:?}", signal.rationale());
        assert_eq!(signal.strength(), 1.0);
    }

    #[test]
    fn breakdown_inside_overbought_band_sells() {
        let signal = with_thresholds(10.0, 5.0)
            .evaluate("NVDA", &reversal(1.0, 75.0, 2_000.0))
            .unwrap();
        assert_eq!(signal.action(), Action::Sell, "{:?}", signal.rationale());
        assert_eq!(
            signal.rationale(),
            Some("EMA crossed below SMA; MACD bearish crossover; RSI overbought; volume surge; RSI below 50")
        );
    }

    #[test]
    fn default_thresholds_hold_a_reversal_on_volume() {
        let signal = MovingAverageStrategy::default()
            .evaluate("NVDA", &reversal(-1.0, 125.0, 2_000.0))
            .unwrap();
        assert_eq!(signal.action(), Action::Hold);
        assert!((signal.strength() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn missing_volume_surge_holds() {
        let signal = MovingAverageStrategy::default()
            .evaluate("NVDA", &reversal(-1.0, 125.0, 1_000.0))
            .unwrap();
        assert_eq!(signal.action(), Action::Hold);
        assert!((signal.strength() - 0.5).abs() < 1e-9);
        assert_eq!(
            signal.rationale(),
            Some("EMA crossed above SMA; MACD bullish crossover; RSI above 50")
        );
    }

    #[test]
    fn lookback_is_driven_by_macd_signal() {
        assert_eq!(MovingAverageStrategy::default().min_lookback(), 35);
    }

    #[test]
    fn ema_must_be_faster_than_sma() {
        let mut params = Params::new();
        params.insert("ema_period".into(), toml::Value::Integer(30));
        assert!(MovingAverageStrategy::from_params("ma", &params).is_err());
    }
}
