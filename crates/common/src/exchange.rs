use async_trait::async_trait;

use crate::{Fill, Order, Result};

/// Abstraction over the brokerage connection.
///
/// `AlpacaClient` implements this for live trading.
/// `PaperClient` implements this for simulation.
///
/// Only `OrderExecutor` in `crates/engine` should hold a `dyn BrokerClient`.
/// Orders only ever originate from a recorded `Decision`.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Submit a market order and return the broker's confirmation.
    async fn submit_order(&self, order: &Order) -> Result<Fill>;
}
