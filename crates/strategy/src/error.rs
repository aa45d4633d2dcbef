use thiserror::Error;

/// Why a strategy could not produce a signal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("insufficient data: need {required} bars, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}")]
    Other(String),
}
