use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use common::Error;

use crate::strategies::{
    BollingerBandStrategy, DivergenceStrategy, HiddenDivergenceStrategy, MovingAverageStrategy,
};

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// type = "rsi"
/// name = "rsi-14"
/// weight = 0.5
///
/// [strategy.params]
/// period = 14
/// overbought = 70.0
/// oversold = 30.0
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy", default)]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy type identifier, e.g. "divergence" or "rsi".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Instance name shown in signals and summaries; defaults to the type.
    #[serde(default)]
    pub name: Option<String>,
    /// Weight under weighted aggregation.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Indicator-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

fn default_weight() -> f64 {
    1.0
}

impl StrategyConfig {
    pub fn new(strategy_type: impl Into<String>) -> Self {
        Self {
            strategy_type: strategy_type.into(),
            name: None,
            weight: default_weight(),
            params: HashMap::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.strategy_type)
    }
}

impl StrategyFileConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> common::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read strategy config '{}': {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("strategy config '{}': {e}", path.display())))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The strategy set used when no file is configured.
    pub fn builtin() -> Self {
        Self {
            strategies: [
                DivergenceStrategy::TYPE,
                HiddenDivergenceStrategy::TYPE,
                MovingAverageStrategy::TYPE,
                BollingerBandStrategy::TYPE,
            ]
            .into_iter()
            .map(StrategyConfig::new)
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_tables_with_defaults() {
        let cfg = StrategyFileConfig::parse(
            r#"
            [[strategy]]
            type = "divergence"

            [[strategy]]
            type = "rsi"
            name = "rsi-fast"
            weight = 2.5

            [strategy.params]
            period = 7
            "#,
        )
        .unwrap();
        assert_eq!(cfg.strategies.len(), 2);
        assert_eq!(cfg.strategies[0].display_name(), "divergence");
        assert_eq!(cfg.strategies[0].weight, 1.0);
        assert_eq!(cfg.strategies[1].display_name(), "rsi-fast");
        assert_eq!(cfg.strategies[1].weight, 2.5);
        assert_eq!(cfg.strategies[1].params["period"].as_integer(), Some(7));
    }

    #[test]
    fn builtin_order_is_fixed() {
        let names: Vec<String> = StrategyFileConfig::builtin()
            .strategies
            .iter()
            .map(|s| s.display_name().to_string())
            .collect();
        assert_eq!(names, ["divergence", "hidden_divergence", "moving_average", "bollinger"]);
    }

    #[test]
    fn load_reports_missing_and_malformed_files_as_config_errors() {
        let missing = StrategyFileConfig::load("/nonexistent/strategies.toml").unwrap_err();
        assert!(matches!(missing, Error::Config(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[strategy]]\nname = \"no type\"").unwrap();
        let malformed = StrategyFileConfig::load(file.path()).unwrap_err();
        assert!(matches!(malformed, Error::Config(_)));
    }
}
