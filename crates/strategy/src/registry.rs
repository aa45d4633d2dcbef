use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use common::Error;

use crate::config::{StrategyConfig, StrategyFileConfig};
use crate::strategies::{
    BollingerBandStrategy, DivergenceStrategy, HiddenDivergenceStrategy, MacdStrategy,
    MovingAverageStrategy, RsiStrategy,
};
use crate::{Strategy, StrategyError};

/// One configured strategy and its aggregation weight.
#[derive(Clone)]
struct RegisteredStrategy {
    strategy: Arc<dyn Strategy>,
    weight: f64,
}

/// The fixed, ordered strategy list of a run.
#[derive(Clone)]
pub struct StrategyRegistry {
    entries: Vec<RegisteredStrategy>,
}

impl StrategyRegistry {
    /// Build the registry from config. Any invalid entry fails the whole set.
    pub fn from_config(file_cfg: &StrategyFileConfig) -> common::Result<Self> {
        if file_cfg.strategies.is_empty() {
            return Err(Error::Config("no strategies configured".into()));
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(file_cfg.strategies.len());
        for cfg in &file_cfg.strategies {
            let name = cfg.display_name();
            if !seen.insert(name.to_string()) {
                return Err(Error::Config(format!("duplicate strategy name '{name}'")));
            }
            if !(cfg.weight.is_finite() && cfg.weight > 0.0) {
                return Err(Error::Config(format!(
                    "strategy '{name}' weight must be a positive number, got {}",
                    cfg.weight
                )));
            }
            let strategy = build_strategy(cfg)
                .map_err(|e| Error::Config(format!("strategy '{name}': {e}")))?;
            info!(
                name = %strategy.name(),
                kind = %cfg.strategy_type,
                weight = cfg.weight,
                min_lookback = strategy.min_lookback(),
                "Registered strategy"
            );
            entries.push(RegisteredStrategy { strategy, weight: cfg.weight });
        }
        Ok(Self { entries })
    }

    /// Strategies in configured order.
    pub fn strategies(&self) -> Vec<Arc<dyn Strategy>> {
        self.entries.iter().map(|e| Arc::clone(&e.strategy)).collect()
    }

    /// Weight per strategy name.
    pub fn weights(&self) -> HashMap<String, f64> {
        self.entries
            .iter()
            .map(|e| (e.strategy.name().to_string(), e.weight))
            .collect()
    }

    /// Longest lookback any strategy needs.
    pub fn max_lookback(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.strategy.min_lookback())
            .max()
            .unwrap_or(0)
    }
}

// ─── Strategy builders ────────────────────────────────────────────────────────

fn build_strategy(cfg: &StrategyConfig) -> Result<Arc<dyn Strategy>, StrategyError> {
    let name = cfg.display_name();
    let params = &cfg.params;
    Ok(match cfg.strategy_type.as_str() {
        DivergenceStrategy::TYPE => Arc::new(DivergenceStrategy::from_params(name, params)?),
        HiddenDivergenceStrategy::TYPE => {
            Arc::new(HiddenDivergenceStrategy::from_params(name, params)?)
        }
        MovingAverageStrategy::TYPE => Arc::new(MovingAverageStrategy::from_params(name, params)?),
        BollingerBandStrategy::TYPE => Arc::new(BollingerBandStrategy::from_params(name, params)?),
        RsiStrategy::TYPE => Arc::new(RsiStrategy::from_params(name, params)?),
        MacdStrategy::TYPE => Arc::new(MacdStrategy::from_params(name, params)?),
        other => {
            return Err(StrategyError::InvalidParameter(format!(
                "unknown strategy type '{other}'"
            )))
        }
    })
}
