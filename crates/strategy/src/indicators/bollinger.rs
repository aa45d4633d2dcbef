use crate::StrategyError;

/// Bollinger Bands: SMA(period) ± `std_mult` population standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub period: usize,
    pub std_mult: f64,
}

/// One point of the bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_mult: f64) -> Result<Self, StrategyError> {
        if period < 2 {
            return Err(StrategyError::InvalidParameter(format!(
                "Bollinger period must be >= 2, got {period}"
            )));
        }
        if !(std_mult > 0.0 && std_mult.is_finite()) {
            return Err(StrategyError::InvalidParameter(format!(
                "Bollinger std multiplier must be positive, got {std_mult}"
            )));
        }
        Ok(Self { period, std_mult })
    }

    /// Bands over the last `period` closes; `None` if fewer are available.
    pub fn latest(&self, closes: &[f64]) -> Option<Band> {
        if closes.len() < self.period {
            return None;
        }
        let window = &closes[closes.len() - self.period..];
        let mean = window.iter().sum::<f64>() / self.period as f64;
        let variance = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / self.period as f64;
        let width = self.std_mult * variance.sqrt();
        Some(Band {
            lower: mean - width,
            middle: mean,
            upper: mean + width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_prices_collapse_the_bands() {
        let bb = BollingerBands::new(5, 2.0).unwrap();
        let band = bb.latest(&[10.0; 8]).unwrap();
        assert_eq!(band, Band { lower: 10.0, middle: 10.0, upper: 10.0 });
    }

    #[test]
    fn known_band_width() {
        let bb = BollingerBands::new(4, 2.0).unwrap();
        // mean 5, population std dev sqrt(5)
        let band = bb.latest(&[100.0, 2.0, 4.0, 6.0, 8.0]).unwrap();
        assert!((band.middle - 5.0).abs() < 1e-12);
        assert!((band.upper - (5.0 + 2.0 * 5.0_f64.sqrt())).abs() < 1e-12);
        assert!((band.lower - (5.0 - 2.0 * 5.0_f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn short_history_has_no_band() {
        let bb = BollingerBands::new(20, 2.0).unwrap();
        assert!(bb.latest(&[1.0; 19]).is_none());
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(BollingerBands::new(1, 2.0).is_err());
        assert!(BollingerBands::new(20, 0.0).is_err());
        assert!(BollingerBands::new(20, f64::NAN).is_err());
    }
}
