use std::collections::HashMap;

use common::{Action, AggregationMethod, Decision, Error, Result, Signal, StrategyFailure};

/// Strength sums closer than this are a tie.
const STRENGTH_EPSILON: f64 = 1e-9;

/// Reduces the signals of one symbol to one decision.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    method: AggregationMethod,
    weights: HashMap<String, f64>,
}

impl Aggregator {
    pub fn new(method: AggregationMethod) -> Self {
        Self { method, weights: HashMap::new() }
    }

    /// Per-strategy weights for `AggregationMethod::Weighted`; unknown names weigh 1.0.
    pub fn with_weights(mut self, weights: HashMap<String, f64>) -> Self {
        self.weights = weights;
        self
    }

    /// Build the decision for `symbol`. Every signal is kept on the decision in
    /// the order given, and `ignored` records the strategies that failed.
    ///
    /// Fails with `AllStrategiesFailed` when there is nothing to combine.
    pub fn aggregate(
        &self,
        symbol: &str,
        signals: Vec<Signal>,
        ignored: Vec<StrategyFailure>,
        reference_price: Option<f64>,
    ) -> Result<Decision> {
        if signals.is_empty() {
            return Err(Error::AllStrategiesFailed(
                ignored.iter().map(|f| format!("{}: {}", f.strategy, f.reason)).collect(),
            ));
        }
        let action = self.combine(&signals);
        Ok(Decision {
            symbol: symbol.to_string(),
            action,
            signals,
            ignored,
            method: self.method,
            reference_price,
        })
    }

    /// The combined action of a non-empty signal set. HOLD for an empty set.
    pub fn combine(&self, signals: &[Signal]) -> Action {
        match self.method {
            AggregationMethod::Majority => majority(signals),
            AggregationMethod::Weighted { threshold } => self.weighted(signals, threshold),
        }
    }

    /// Weighted mean of signed strengths in `-1.0..=1.0`.
    pub fn score(&self, signals: &[Signal]) -> f64 {
        let mut total_weight = 0.0;
        let mut score = 0.0;
        for signal in signals {
            let weight = self.weights.get(signal.strategy()).copied().unwrap_or(1.0);
            total_weight += weight;
            score += weight * signal.action().direction() * signal.strength();
        }
        if total_weight > 0.0 {
            score / total_weight
        } else {
            0.0
        }
    }

    fn weighted(&self, signals: &[Signal], threshold: f64) -> Action {
        let score = self.score(signals);
        if score > threshold {
            Action::Buy
        } else if score < -threshold {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}

/// Most signals wins. A tie on count goes to the larger summed strength;
/// a tie on both is HOLD.
fn majority(signals: &[Signal]) -> Action {
    let tally = |action: Action| {
        signals
            .iter()
            .filter(|s| s.action() == action)
            .fold((0usize, 0.0f64), |(n, sum), s| (n + 1, sum + s.strength()))
    };
    let tallies: Vec<(Action, usize, f64)> = Action::ALL
        .iter()
        .map(|&action| {
            let (count, strength) = tally(action);
            (action, count, strength)
        })
        .collect();

    let top_count = tallies.iter().map(|t| t.1).max().unwrap_or(0);
    if top_count == 0 {
        return Action::Hold;
    }
    let mut leaders: Vec<&(Action, usize, f64)> =
        tallies.iter().filter(|t| t.1 == top_count).collect();
    if leaders.len() == 1 {
        return leaders[0].0;
    }

    leaders.sort_by(|a, b| b.2.total_cmp(&a.2));
    if leaders[0].2 - leaders[1].2 > STRENGTH_EPSILON {
        leaders[0].0
    } else {
        Action::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_714_593_600, 0).unwrap()
    }

    fn sig(strategy: &str, action: Action, strength: f64) -> Signal {
        Signal::new(strategy, "AAPL", action, strength, ts())
    }

    fn majority_of(signals: &[Signal]) -> Action {
        Aggregator::new(AggregationMethod::Majority).combine(signals)
    }

    #[test]
    fn two_buys_beat_one_sell() {
        let signals = [sig("a", Action::Buy, 0.2), sig("b", Action::Buy, 0.2), sig("c", Action::Sell, 1.0)];
        assert_eq!(majority_of(&signals), Action::Buy);
    }

    #[test]
    fn equal_tie_is_hold() {
        let signals = [sig("a", Action::Buy, 0.5), sig("b", Action::Sell, 0.5)];
        assert_eq!(majority_of(&signals), Action::Hold);
    }

    #[test]
    fn tie_goes_to_stronger_side() {
        let signals = [sig("a", Action::Buy, 0.9), sig("b", Action::Sell, 0.3)];
        assert_eq!(majority_of(&signals), Action::Buy);
        let signals = [sig("a", Action::Buy, 0.3), sig("b", Action::Sell, 0.9)];
        assert_eq!(majority_of(&signals), Action::Sell);
    }

    #[test]
    fn three_way_tie_uses_strength_among_all() {
        let signals = [
            sig("a", Action::Buy, 0.4),
            sig("b", Action::Sell, 0.4),
            sig("c", Action::Hold, 0.8),
        ];
        assert_eq!(majority_of(&signals), Action::Hold);
        let signals = [
            sig("a", Action::Buy, 0.7),
            sig("b", Action::Sell, 0.4),
            sig("c", Action::Hold, 0.2),
        ];
        assert_eq!(majority_of(&signals), Action::Buy);
    }

    #[test]
    fn near_equal_strengths_count_as_a_tie() {
        let signals = [sig("a", Action::Buy, 0.1 + 0.2), sig("b", Action::Sell, 0.3)];
        assert_eq!(majority_of(&signals), Action::Hold);
    }

    #[test]
    fn weighted_blend_respects_threshold_and_weights() {
        let weights = HashMap::from([("trend".to_string(), 3.0), ("meanrev".to_string(), 1.0)]);
        let agg = Aggregator::new(AggregationMethod::Weighted { threshold: 0.2 }).with_weights(weights);

        // (3 * 0.8 - 1 * 1.0) / 4 = 0.35
        let signals = [sig("trend", Action::Buy, 0.8), sig("meanrev", Action::Sell, 1.0)];
        assert!((agg.score(&signals) - 0.35).abs() < 1e-12);
        assert_eq!(agg.combine(&signals), Action::Buy);

        // (3 * 0.1 - 1 * 1.0) / 4 = -0.175, inside the band
        let signals = [sig("trend", Action::Buy, 0.1), sig("meanrev", Action::Sell, 1.0)];
        assert_eq!(agg.combine(&signals), Action::Hold);

        let signals = [sig("trend", Action::Sell, 0.5)];
        assert_eq!(agg.combine(&signals), Action::Sell);
    }

    #[test]
    fn hold_signals_dilute_weighted_score() {
        let agg = Aggregator::new(AggregationMethod::Weighted { threshold: 0.2 });
        let signals = [
            sig("a", Action::Buy, 0.5),
            sig("b", Action::Hold, 1.0),
            sig("c", Action::Hold, 1.0),
        ];
        assert_eq!(agg.combine(&signals), Action::Hold);
    }

    #[test]
    fn decision_keeps_signals_and_failures_in_order() {
        let agg = Aggregator::new(AggregationMethod::Majority);
        let signals = vec![sig("b", Action::Sell, 0.4), sig("a", Action::Sell, 0.6)];
        let ignored = vec![StrategyFailure { strategy: "c".into(), reason: "too short".into() }];
        let decision = agg.aggregate("AAPL", signals.clone(), ignored.clone(), Some(187.5)).unwrap();
        assert_eq!(decision.action, Action::Sell);
        assert_eq!(decision.signals, signals);
        assert_eq!(decision.ignored, ignored);
        assert_eq!(decision.method, AggregationMethod::Majority);
        assert_eq!(decision.reference_price, Some(187.5));
    }

    #[test]
    fn empty_signal_set_is_not_a_decision() {
        let agg = Aggregator::new(AggregationMethod::Majority);
        let ignored = vec![StrategyFailure { strategy: "rsi".into(), reason: "too short".into() }];
        let err = agg.aggregate("AAPL", Vec::new(), ignored, None).unwrap_err();
        assert_eq!(err.to_string(), "all strategies failed: rsi: too short");
    }
}
