use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar. Histories are always ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Recommended action of a signal or decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Buy, Action::Sell, Action::Hold];

    /// +1 for BUY, -1 for SELL, 0 for HOLD.
    pub fn direction(&self) -> f64 {
        match self {
            Action::Buy => 1.0,
            Action::Sell => -1.0,
            Action::Hold => 0.0,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// One strategy's recommendation for one symbol at one evaluation time.
///
/// Fields are private so a signal cannot be altered after construction;
/// `strength` is clamped into `0.0..=1.0` (NaN becomes 0.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    strategy: String,
    symbol: String,
    action: Action,
    strength: f64,
    rationale: Option<String>,
    as_of: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        strategy: impl Into<String>,
        symbol: impl Into<String>,
        action: Action,
        strength: f64,
        as_of: DateTime<Utc>,
    ) -> Self {
        let strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };
        Self {
            strategy: strategy.into(),
            symbol: symbol.into(),
            action,
            strength,
            rationale: None,
            as_of,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        let rationale = rationale.into();
        self.rationale = if rationale.trim().is_empty() { None } else { Some(rationale) };
        self
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn rationale(&self) -> Option<&str> {
        self.rationale.as_deref()
    }

    /// Timestamp of the last bar the strategy evaluated.
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }
}

/// A strategy that could not produce a signal for a symbol, kept on the
/// decision so nothing is dropped silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub reason: String,
}

/// How the signals of one symbol were combined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "method")]
pub enum AggregationMethod {
    /// Most signals wins; ties go to the larger summed strength, then HOLD.
    #[default]
    Majority,
    /// Weighted blend of signed strengths compared against `threshold`.
    Weighted { threshold: f64 },
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationMethod::Majority => write!(f, "majority"),
            AggregationMethod::Weighted { .. } => write!(f, "weighted"),
        }
    }
}

/// The combined, final recommendation for one symbol in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    pub action: Action,
    /// Signals that took part in the aggregation, in strategy order.
    pub signals: Vec<Signal>,
    /// Strategies that failed for this symbol and were left out.
    pub ignored: Vec<StrategyFailure>,
    pub method: AggregationMethod,
    /// Last close of the evaluated history.
    pub reference_price: Option<f64>,
}

impl Decision {
    /// The order side this decision calls for, `None` for HOLD.
    pub fn order_side(&self) -> Option<OrderSide> {
        match self.action {
            Action::Buy => Some(OrderSide::Buy),
            Action::Sell => Some(OrderSide::Sell),
            Action::Hold => None,
        }
    }
}

/// Result of running one symbol through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SymbolOutcome {
    Succeeded(Decision),
    Failed { symbol: String, error: String },
}

impl SymbolOutcome {
    pub fn failed(symbol: impl Into<String>, error: impl std::fmt::Display) -> Self {
        SymbolOutcome::Failed {
            symbol: symbol.into(),
            error: error.to_string(),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Succeeded(decision) => &decision.symbol,
            SymbolOutcome::Failed { symbol, .. } => symbol,
        }
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            SymbolOutcome::Succeeded(decision) => Some(decision),
            SymbolOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SymbolOutcome::Failed { .. })
    }
}

/// Per-action totals of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn succeeded(&self) -> usize {
        self.buy + self.sell + self.hold
    }
}

/// One outcome per requested symbol, in request order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub outcomes: Vec<SymbolOutcome>,
}

impl BatchResult {
    pub fn new(outcomes: Vec<SymbolOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolOutcome> {
        self.outcomes.iter()
    }

    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.outcomes.iter().filter_map(SymbolOutcome::decision)
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for outcome in &self.outcomes {
            match outcome {
                SymbolOutcome::Succeeded(d) => match d.action {
                    Action::Buy => counts.buy += 1,
                    Action::Sell => counts.sell += 1,
                    Action::Hold => counts.hold += 1,
                },
                SymbolOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order derived from a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    /// Price the decision was made at; brokers may ignore it.
    pub reference_price: Option<f64>,
}

impl Order {
    pub fn market(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
        reference_price: Option<f64>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            quantity,
            reference_price,
        }
    }
}

/// Confirmation returned by a broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    /// `None` when the broker accepted the order but has not filled it yet.
    pub fill_price: Option<f64>,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
}

/// An open simulated position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub entry_price: f64,
    pub quantity: f64,
    pub opened_at: DateTime<Utc>,
}

/// Whether decisions are turned into orders, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Off,
    Paper,
    Live,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Off => write!(f, "off"),
            ExecutionMode::Paper => write!(f, "paper"),
            ExecutionMode::Live => write!(f, "live"),
        }
    }
}
