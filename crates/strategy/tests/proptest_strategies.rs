use chrono::{Duration, TimeZone, Utc};
use common::Bar;
use proptest::prelude::*;
use strategy::{StrategyConfig, StrategyFileConfig, StrategyRegistry};

fn bars(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2023, 6, 1, 20, 0, 0).unwrap();
    closes
        .iter()
        .zip(volumes.iter().cycle())
        .enumerate()
        .map(|(i, (&close, &volume))| Bar {
            time: start + Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume,
        })
        .collect()
}

fn every_strategy() -> StrategyRegistry {
    let strategies = ["divergence", "hidden_divergence", "moving_average", "bollinger", "rsi", "macd"]
        .into_iter()
        .map(StrategyConfig::new)
        .collect();
    StrategyRegistry::from_config(&StrategyFileConfig { strategies }).unwrap()
}

proptest! {
    /// Any positive price path of sufficient length yields exactly one in-range signal.
    #[test]
    fn strategies_never_panic_and_keep_strength_in_range(
        closes in prop::collection::vec(0.01f64..100_000.0, 50..160),
        volumes in prop::collection::vec(0.0f64..1e9, 1..20),
    ) {
        let history = bars(&closes, &volumes);
        for strategy in every_strategy().strategies() {
            let signal = strategy.evaluate("PROP", &history).unwrap();
            prop_assert!((0.0..=1.0).contains(&signal.strength()));
            prop_assert_eq!(signal.strategy(), strategy.name());
            prop_assert_eq!(signal.symbol(), "PROP");
            prop_assert_eq!(signal.as_of(), history[history.len() - 1].time);
        }
    }

    /// Evaluating twice over the same bars gives identical signals.
    #[test]
    fn evaluation_is_deterministic(
        closes in prop::collection::vec(1.0f64..500.0, 60..100),
    ) {
        let history = bars(&closes, &[1_000.0, 1_500.0, 800.0]);
        for strategy in every_strategy().strategies() {
            let first = strategy.evaluate("AAPL", &history).unwrap();
            let second = strategy.evaluate("AAPL", &history).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    /// Histories shorter than the declared lookback are refused, never evaluated.
    #[test]
    fn short_histories_fail_with_insufficient_data(len in 1usize..15) {
        let history = bars(&vec![100.0; len], &[1_000.0]);
        for strategy in every_strategy().strategies() {
            prop_assert!(len < strategy.min_lookback());
            let result = strategy.evaluate("AAPL", &history);
            prop_assert!(
                matches!(result, Err(strategy::StrategyError::InsufficientData { .. })),
                "unexpected result: {:?}",
                result
            );
        }
    }
}
