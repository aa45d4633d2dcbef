use common::{Action, Bar, Signal};

use super::{check_known, fraction, param_f64, param_usize, Params};
use crate::indicators::{
    volume_surge, BollingerBands, Crossover, MacdIndicator, RsiIndicator, Stochastic,
};
use crate::{closes, ensure_lookback, Strategy, StrategyError};

const CONDITIONS: usize = 5;
const VOLUME_FACTOR: f64 = 1.2;

/// Band break confirmed by RSI extremes, MACD and KDJ crossovers and a volume spike.
///
/// Only a full five-way confluence trades; anything less holds and lists
/// which conditions did fire.
pub struct BollingerBandStrategy {
    name: String,
    bands: BollingerBands,
    rsi: RsiIndicator,
    macd: MacdIndicator,
    kdj: Stochastic,
    volume_window: usize,
}

impl BollingerBandStrategy {
    pub const TYPE: &'static str = "bollinger";
    pub const PARAMS: &'static [&'static str] = &[
        "bb_period",
        "bb_std",
        "rsi_period",
        "overbought",
        "oversold",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "kdj_k_period",
        "kdj_slow_k",
        "kdj_slow_d",
        "volume_window",
    ];

    pub fn from_params(name: impl Into<String>, params: &Params) -> Result<Self, StrategyError> {
        check_known(params, Self::PARAMS)?;
        let volume_window = param_usize(params, "volume_window", 5)?;
        if volume_window == 0 {
            return Err(StrategyError::InvalidParameter(
                "volume_window must be positive".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            bands: BollingerBands::new(
                param_usize(params, "bb_period", 20)?,
                param_f64(params, "bb_std", 2.0)?,
            )?,
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
            kdj: Stochastic::new(
                param_usize(params, "kdj_k_period", 14)?,
                param_usize(params, "kdj_slow_k", 3)?,
                param_usize(params, "kdj_slow_d", 3)?,
            )?,
            volume_window,
        })
    }
}

impl Default for BollingerBandStrategy {
    fn default() -> Self {
        Self {
            name: Self::TYPE.to_string(),
            bands: BollingerBands { period: 20, std_mult: 2.0 },
            rsi: RsiIndicator { period: 14, overbought: 70.0, oversold: 30.0 },
            macd: MacdIndicator { fast: 12, slow: 26, signal: 9 },
            kdj: Stochastic { k_period: 14, slow_k: 3, slow_d: 3 },
            volume_window: 5,
        }
    }
}

impl Strategy for BollingerBandStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_lookback(&self) -> usize {
        self.bands
            .period
            .max(self.rsi.warmup())
            .max(self.macd.signal_warmup() + 1)
            .max(self.kdj.warmup() + 1)
            .max(self.volume_window + 1)
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Signal, StrategyError> {
        ensure_lookback(self.min_lookback(), bars)?;
        let closes = closes(bars);
        let close = closes[closes.len() - 1];
        let as_of = bars[bars.len() - 1].time;

        let band = self.bands.latest(&closes);
        let rsi = self.rsi.compute(&closes);
        let macd_cross = self.macd.compute(&closes);
        let kdj = self.kdj.series(bars);
        let k: Vec<Option<f64>> = kdj.iter().map(|v| v.map(|p| p.k)).collect();
        let d: Vec<Option<f64>> = kdj.iter().map(|v| v.map(|p| p.d)).collect();
        let kdj_cross = Crossover::latest(&k, &d);
        let spike = volume_surge(bars, self.volume_window, VOLUME_FACTOR).unwrap_or(false);

        let bullish = [
            (band.is_some_and(|b| close < b.lower), "price below lower band"),
            (rsi.is_some_and(|v| v < self.rsi.oversold), "RSI oversold"),
            (macd_cross == Some(Crossover::Bullish), "MACD bullish cross"),
            (kdj_cross == Some(Crossover::Bullish), "KDJ bullish cross"),
            (spike, "volume spike"),
        ];
        let bearish = [
            (band.is_some_and(|b| close > b.upper), "price above upper band"),
            (rsi.is_some_and(|v| v > self.rsi.overbought), "RSI overbought"),
            (macd_cross == Some(Crossover::Bearish), "MACD bearish cross"),
            (kdj_cross == Some(Crossover::Bearish), "KDJ bearish cross"),
            (spike, "volume spike"),
        ];
        let bull = bullish.iter().filter(|(hit, _)| *hit).count();
        let bear = bearish.iter().filter(|(hit, _)| *hit).count();

        let (action, strength) = if bull == CONDITIONS {
            (Action::Buy, 1.0)
        } else if bear == CONDITIONS {
            (Action::Sell, 1.0)
        } else {
            (Action::Hold, 1.0 - fraction(bull.max(bear), CONDITIONS))
        };

        // Every fired condition from either side, the shared volume spike once.
        let mut reasons: Vec<&str> = Vec::new();
        for (hit, label) in bullish.iter().take(4).chain(bearish.iter().take(4)) {
            if *hit {
                reasons.push(label);
            }
        }
        if spike {
            reasons.push("volume spike");
        }
        let rationale = match action {
            Action::Buy => "price below lower band, RSI oversold, MACD/KDJ bullish cross, volume spike".to_string(),
            Action::Sell => "price above upper band, RSI overbought, MACD/KDJ bearish cross, volume spike".to_string(),
            Action::Hold if reasons.is_empty() => "no strong signal".to_string(),
            Action::Hold => reasons.join("; "),
        };
        Ok(Signal::new(&self.name, symbol, action, strength, as_of).with_rationale(rationale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::bars_from_closes;

    #[test]
    fn quiet_market_has_no_strong_signal() {
        let signal = BollingerBandStrategy::default()
            .evaluate("TSLA", &bars_from_closes(&[100.0; 50]))
            .unwrap();
        assert_eq!(signal.action(), Action::Hold);
        assert_eq!(signal.strength(), 1.0);
        assert_eq!(signal.rationale(), Some("no strong signal"));
    }

    #[test]
    fn crash_bar_lists_partial_confluence() {
        let mut closes = vec![100.0; 49];
        closes.push(80.0);
        let mut bars = bars_from_closes(&closes);
        if let Some(bar) = bars.last_mut() {
            bar.volume = 5_000.0;
        }
        let signal = BollingerBandStrategy::default().evaluate("TSLA", &bars).unwrap();
        assert_eq!(signal.action(), Action::Hold);
        // Three of five on each side: band + RSI + spike, MACD + KDJ + spike.
        assert!((signal.strength() - 0.4).abs() < 1e-9);
        assert_eq!(
            signal.rationale(),
            Some("price below lower band; RSI oversold; MACD bearish cross; KDJ bearish cross; volume spike")
        );
    }

    #[test]
    fn lookback_covers_macd_signal_line() {
        let strategy = BollingerBandStrategy::default();
        assert_eq!(strategy.min_lookback(), 35);
        assert!(strategy.evaluate("TSLA", &bars_from_closes(&[100.0; 34])).is_err());
    }

    #[test]
    fn thresholds_are_configurable_and_validated() {
        let mut params = Params::new();
        params.insert("oversold".into(), toml::Value::Float(80.0));
        assert!(BollingerBandStrategy::from_params("bb", &params).is_err());
        params.insert("oversold".into(), toml::Value::Float(20.0));
        assert!(BollingerBandStrategy::from_params("bb", &params).is_ok());
    }
}
