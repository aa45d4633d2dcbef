use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{BrokerClient, Error, Fill, Order, OrderSide, Position, Result};

/// Simulated broker for paper execution.
///
/// Fills at the order's reference price with configurable slippage and keeps
/// an in-memory position book. Nothing ever leaves the process.
pub struct PaperClient {
    /// Open simulated positions, oldest first.
    positions: Arc<RwLock<Vec<Position>>>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperClient {
    pub fn new(slippage_bps: f64) -> Self {
        info!(slippage_bps = slippage_bps, "PaperClient initialized");
        Self {
            positions: Arc::new(RwLock::new(Vec::new())),
            slippage_bps,
        }
    }

    pub async fn open_positions(&self) -> Vec<Position> {
        self.positions.read().await.clone()
    }

    fn fill_price(&self, side: OrderSide, reference: f64) -> f64 {
        // Buys pay more, sells receive less
        match side {
            OrderSide::Buy => reference * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => reference * (1.0 - self.slippage_bps / 10_000.0),
        }
    }
}

#[async_trait]
impl BrokerClient for PaperClient {
    async fn submit_order(&self, order: &Order) -> Result<Fill> {
        let reference = order
            .reference_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| {
                Error::ExecutionFailure(format!(
                    "paper fill for {} needs a positive reference price",
                    order.symbol
                ))
            })?;
        let fill_price = self.fill_price(order.side, reference);

        debug!(
            symbol = %order.symbol,
            side = %order.side,
            reference = reference,
            fill = fill_price,
            qty = order.quantity,
            "Paper fill simulated"
        );

        let now = Utc::now();
        let mut positions = self.positions.write().await;
        // An opposite-side order closes the oldest matching position; otherwise it opens one.
        let closing = positions
            .iter()
            .position(|p| p.symbol == order.symbol && p.side != order.side);
        match closing {
            Some(idx) => {
                let closed = positions.remove(idx);
                info!(symbol = %closed.symbol, side = %closed.side, "Paper position closed");
            }
            None => positions.push(Position {
                id: order.id.clone(),
                symbol: order.symbol.clone(),
                side: order.side,
                entry_price: fill_price,
                quantity: order.quantity,
                opened_at: now,
            }),
        }

        Ok(Fill {
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            fill_price: Some(fill_price),
            quantity: order.quantity,
            timestamp: now,
        })
    }
}
