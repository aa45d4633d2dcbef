use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use common::{BatchResult, BrokerClient, Decision, ExecutionMode, Fill, Order, OrderSide};

/// Outcome of one order attempt. A rejected order never changes the decision
/// it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub result: Result<Fill, String>,
}

impl ExecutionReport {
    pub fn is_filled(&self) -> bool {
        self.result.is_ok()
    }
}

/// Turns actionable decisions into market orders and submits them.
///
/// This is the ONLY component that calls `BrokerClient::submit_order`.
pub struct OrderExecutor {
    client: Arc<dyn BrokerClient>,
    quantity: f64,
    mode: ExecutionMode,
}

impl OrderExecutor {
    pub fn new(client: Arc<dyn BrokerClient>, quantity: f64, mode: ExecutionMode) -> Self {
        Self { client, quantity, mode }
    }

    /// Submit one order per non-HOLD decision, in batch order.
    pub async fn execute(&self, batch: &BatchResult) -> Vec<ExecutionReport> {
        let mut reports = Vec::new();
        for decision in batch.decisions() {
            if let Some(report) = self.execute_decision(decision).await {
                reports.push(report);
            }
        }
        reports
    }

    pub async fn execute_decision(&self, decision: &Decision) -> Option<ExecutionReport> {
        let side = decision.order_side()?;
        let order = Order::market(&decision.symbol, side, self.quantity, decision.reference_price);
        info!(
            symbol = %order.symbol,
            side = %side,
            qty = order.quantity,
            mode = %self.mode,
            "Executing order"
        );

        let result = match self.client.submit_order(&order).await {
            Ok(fill) => {
                info!(
                    symbol = %fill.symbol,
                    price = ?fill.fill_price,
                    qty = fill.quantity,
                    "Order accepted"
                );
                Ok(fill)
            }
            Err(e) => {
                error!(symbol = %order.symbol, error = %e, "Order submission failed");
                Err(e.to_string())
            }
        };
        Some(ExecutionReport {
            symbol: order.symbol,
            side,
            quantity: order.quantity,
            result,
        })
    }
}
