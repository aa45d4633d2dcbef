use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use common::{Bar, DataProvider, Error, Signal, StrategyFailure, SymbolOutcome};
use strategy::Strategy;

use crate::aggregator::Aggregator;

/// Stages a symbol passes through in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Fetching,
    Evaluating,
    Aggregating,
    Done,
    Failed,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerState::Fetching => "fetching",
            RunnerState::Evaluating => "evaluating",
            RunnerState::Aggregating => "aggregating",
            RunnerState::Done => "done",
            RunnerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Fetch → evaluate every strategy → aggregate, for exactly one symbol.
///
/// Never returns an error: every failure ends up in the `SymbolOutcome`.
pub struct SymbolRunner {
    provider: Arc<dyn DataProvider>,
    strategies: Vec<Arc<dyn Strategy>>,
    aggregator: Aggregator,
    lookback: usize,
}

impl SymbolRunner {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        strategies: Vec<Arc<dyn Strategy>>,
        aggregator: Aggregator,
        lookback: usize,
    ) -> Self {
        Self { provider, strategies, aggregator, lookback }
    }

    pub fn strategies(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    pub async fn run(&self, symbol: &str) -> SymbolOutcome {
        debug!(symbol = %symbol, state = %RunnerState::Fetching, "Symbol runner");
        let bars = match self.fetch(symbol).await {
            Ok(bars) => bars,
            Err(e) => return fail(symbol, RunnerState::Fetching, e),
        };

        debug!(symbol = %symbol, state = %RunnerState::Evaluating, bars = bars.len(), "Symbol runner");
        let (signals, ignored) = self.evaluate(symbol, &bars);

        debug!(
            symbol = %symbol,
            state = %RunnerState::Aggregating,
            signals = signals.len(),
            ignored = ignored.len(),
            "Symbol runner"
        );
        let reference_price = bars.last().map(|b| b.close);
        match self.aggregator.aggregate(symbol, signals, ignored, reference_price) {
            Ok(decision) => {
                debug!(
                    symbol = %symbol,
                    state = %RunnerState::Done,
                    action = %decision.action,
                    method = %decision.method,
                    "Symbol runner"
                );
                SymbolOutcome::Succeeded(decision)
            }
            Err(e) => fail(symbol, RunnerState::Aggregating, e),
        }
    }

    async fn fetch(&self, symbol: &str) -> common::Result<Vec<Bar>> {
        let bars = self.provider.fetch(symbol, self.lookback).await.map_err(|e| match e {
            Error::DataUnavailable(_) => e,
            other => Error::DataUnavailable(other.to_string()),
        })?;
        if bars.is_empty() {
            return Err(Error::DataUnavailable(format!("no bars returned for {symbol}")));
        }
        if bars.windows(2).any(|w| w[1].time <= w[0].time) {
            return Err(Error::DataUnavailable(format!("bars for {symbol} are not in time order")));
        }
        Ok(bars)
    }

    /// Run every strategy in order; a failing or panicking strategy is recorded
    /// and the rest still run.
    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> (Vec<Signal>, Vec<StrategyFailure>) {
        let mut signals = Vec::with_capacity(self.strategies.len());
        let mut ignored = Vec::new();
        for strategy in &self.strategies {
            let name = strategy.name();
            let result = catch_unwind(AssertUnwindSafe(|| strategy.evaluate(symbol, bars)));
            let reason = match result {
                Ok(Ok(signal)) => {
                    debug!(
                        symbol = %symbol,
                        strategy = %name,
                        action = %signal.action(),
                        strength = signal.strength(),
                        "Signal"
                    );
                    signals.push(signal);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
            };
            let failure = Error::StrategyFailure { strategy: name.to_string(), reason: reason.clone() };
            warn!(symbol = %symbol, error = %failure, "Strategy skipped");
            ignored.push(StrategyFailure { strategy: name.to_string(), reason });
        }
        (signals, ignored)
    }
}

fn fail(symbol: &str, stage: RunnerState, error: Error) -> SymbolOutcome {
    warn!(symbol = %symbol, stage = %stage, state = %RunnerState::Failed, error = %error, "Symbol failed");
    SymbolOutcome::failed(symbol, error)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use common::{Action, AggregationMethod};
    use strategy::StrategyError;

    struct FixedProvider(common::Result<Vec<Bar>>);

    #[async_trait]
    impl DataProvider for FixedProvider {
        async fn fetch(&self, _symbol: &str, _lookback: usize) -> common::Result<Vec<Bar>> {
            match &self.0 {
                Ok(bars) => Ok(bars.clone()),
                Err(e) => Err(Error::Http(e.to_string())),
            }
        }
    }

    enum Behaviour {
        Emit(Action, f64),
        Fail,
        Panic,
    }

    struct Scripted {
        name: &'static str,
        behaviour: Behaviour,
    }

    impl Strategy for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn min_lookback(&self) -> usize {
            1
        }

        fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Signal, StrategyError> {
            match self.behaviour {
                Behaviour::Emit(action, strength) => {
                    Ok(Signal::new(self.name, symbol, action, strength, bars[bars.len() - 1].time))
                }
                Behaviour::Fail => Err(StrategyError::InsufficientData { required: 99, available: bars.len() }),
                Behaviour::Panic => panic!("index out of range"),
            }
        }
    }

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();
        (0..n)
            .map(|i| Bar {
                time: start + Duration::days(i as i64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0 + i as f64,
                volume: 100.0,
            })
            .collect()
    }

    fn runner(provider: FixedProvider, strategies: Vec<Scripted>) -> SymbolRunner {
        SymbolRunner::new(
            Arc::new(provider),
            strategies.into_iter().map(|s| Arc::new(s) as Arc<dyn Strategy>).collect(),
            Aggregator::new(AggregationMethod::Majority),
            30,
        )
    }

    #[tokio::test]
    async fn failing_and_panicking_strategies_are_isolated() {
        let runner = runner(
            FixedProvider(Ok(bars(5))),
            vec![
                Scripted { name: "buyer", behaviour: Behaviour::Emit(Action::Buy, 0.7) },
                Scripted { name: "short", behaviour: Behaviour::Fail },
                Scripted { name: "crashy", behaviour: Behaviour::Panic },
                Scripted { name: "holder", behaviour: Behaviour::Emit(Action::Hold, 0.2) },
            ],
        );
        let outcome = runner.run("AAPL").await;
        let decision = outcome.decision().expect("succeeded");
        assert_eq!(decision.action, Action::Buy);
        assert_eq!(decision.signals.len(), 2);
        assert_eq!(decision.reference_price, Some(14.0));
        let ignored: Vec<&str> = decision.ignored.iter().map(|f| f.strategy.as_str()).collect();
        assert_eq!(ignored, ["short", "crashy"]);
        assert_eq!(decision.ignored[1].reason, "panicked: index out of range");
    }

    #[tokio::test]
    async fn every_strategy_failing_fails_the_symbol() {
        let runner = runner(
            FixedProvider(Ok(bars(5))),
            vec![Scripted { name: "short", behaviour: Behaviour::Fail }],
        );
        let outcome = runner.run("AAPL").await;
        match outcome {
            SymbolOutcome::Failed { symbol, error } => {
                assert_eq!(symbol, "AAPL");
                assert!(error.starts_with("all strategies failed"), "{error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provider_errors_become_data_unavailable() {
        let runner = runner(
            FixedProvider(Err(Error::Http("404 Not Found".into()))),
            vec![Scripted { name: "buyer", behaviour: Behaviour::Emit(Action::Buy, 1.0) }],
        );
        let SymbolOutcome::Failed { error, .. } = runner.run("ZZZZ").await else {
            panic!("expected failure");
        };
        assert!(error.starts_with("data unavailable"), "{error}");
        assert!(error.contains("404"), "{error}");
    }

    #[tokio::test]
    async fn empty_or_unordered_history_is_unavailable() {
        let runner_empty = runner(
            FixedProvider(Ok(Vec::new())),
            vec![Scripted { name: "buyer", behaviour: Behaviour::Emit(Action::Buy, 1.0) }],
        );
        assert!(runner_empty.run("AAPL").await.is_failed());

        let mut shuffled = bars(3);
        shuffled.swap(0, 2);
        let runner_unordered = runner(
            FixedProvider(Ok(shuffled)),
            vec![Scripted { name: "buyer", behaviour: Behaviour::Emit(Action::Buy, 1.0) }],
        );
        assert!(runner_unordered.run("AAPL").await.is_failed());
    }
}
