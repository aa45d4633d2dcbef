pub mod config;
pub mod error;
pub mod indicators;
pub mod registry;
pub mod strategies;

pub use config::{StrategyConfig, StrategyFileConfig};
pub use error::StrategyError;
pub use registry::StrategyRegistry;

use common::{Bar, Signal};

/// All strategy implementations must satisfy this trait.
///
/// Strategies are pure: the same bars always produce the same signal, and
/// evaluating one never affects another.
pub trait Strategy: Send + Sync {
    /// Identifier of this strategy instance, unique within a run.
    fn name(&self) -> &str;

    /// Fewest bars `evaluate` accepts.
    fn min_lookback(&self) -> usize;

    /// Evaluate a chronological, non-empty history and produce exactly one signal.
    ///
    /// Fails with `StrategyError::InsufficientData` below `min_lookback()`.
    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Signal, StrategyError>;
}

/// Shared guard for `Strategy::evaluate` implementations.
pub(crate) fn ensure_lookback(required: usize, bars: &[Bar]) -> Result<(), StrategyError> {
    if bars.len() < required.max(1) {
        return Err(StrategyError::InsufficientData {
            required: required.max(1),
            available: bars.len(),
        });
    }
    Ok(())
}

/// Closing prices of a history, oldest first.
pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
