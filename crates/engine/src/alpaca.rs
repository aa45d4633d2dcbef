use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use common::{AlpacaConfig, BrokerClient, Error, Fill, Order, OrderSide, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the Alpaca trading API. Used for live order placement.
pub struct AlpacaClient {
    api_key: String,
    secret: String,
    base_url: Url,
    http: Client,
}

impl AlpacaClient {
    pub fn new(cfg: &AlpacaConfig) -> Result<Self> {
        Self::with_timeout(cfg, REQUEST_TIMEOUT)
    }

    /// Every order request gives up after `timeout`.
    pub fn with_timeout(cfg: &AlpacaConfig, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: cfg.api_key.clone(),
            secret: cfg.secret.clone(),
            base_url: cfg.base_url.clone(),
            http,
        })
    }

    fn orders_url(&self) -> Result<Url> {
        self.base_url
            .join("v2/orders")
            .map_err(|e| Error::Config(format!("invalid Alpaca base URL: {e}")))
    }
}

#[async_trait]
impl BrokerClient for AlpacaClient {
    async fn submit_order(&self, order: &Order) -> Result<Fill> {
        let request = OrderRequest::from(order);
        debug!(symbol = %order.symbol, side = %request.side, "Submitting order to Alpaca");

        let resp = self
            .http
            .post(self.orders_url()?)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.secret)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::ExecutionFailure(format!("HTTP {status}: {body}")));
        }

        let accepted: OrderResponse = serde_json::from_str(&body)
            .map_err(|e| Error::ExecutionFailure(format!("unexpected order response: {e}")))?;
        Ok(accepted.into_fill(order))
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OrderRequest {
    symbol: String,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    client_order_id: String,
}

impl From<&Order> for OrderRequest {
    fn from(order: &Order) -> Self {
        Self {
            symbol: order.symbol.clone(),
            qty: order.quantity.to_string(),
            side: match order.side {
                OrderSide::Buy => "buy",
                OrderSide::Sell => "sell",
            },
            order_type: "market",
            time_in_force: "day",
            client_order_id: order.id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    #[serde(default)]
    filled_avg_price: Option<String>,
}

impl OrderResponse {
    fn into_fill(self, order: &Order) -> Fill {
        Fill {
            order_id: self.id,
            symbol: order.symbol.clone(),
            side: order.side,
            fill_price: self.filled_avg_price.and_then(|p| p.parse::<f64>().ok()),
            quantity: order.quantity,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(side: OrderSide) -> Order {
        Order::market("AAPL", side, 2.5, Some(190.0))
    }

    fn config(base_url: &str) -> AlpacaConfig {
        AlpacaConfig {
            api_key: "key".into(),
            secret: "secret".into(),
            base_url: Url::parse(base_url).unwrap(),
        }
    }

    #[test]
    fn request_is_a_day_market_order() {
        let order = order(OrderSide::Sell);
        let json = serde_json::to_value(OrderRequest::from(&order)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "symbol": "AAPL",
                "qty": "2.5",
                "side": "sell",
                "type": "market",
                "time_in_force": "day",
                "client_order_id": order.id,
            })
        );
    }

    #[test]
    fn pending_order_has_no_fill_price() {
        let body = r#"{"id":"61e69015","status":"accepted","filled_avg_price":null,"filled_qty":"0"}"#;
        let resp: OrderResponse = serde_json::from_str(body).unwrap();
        let fill = resp.into_fill(&order(OrderSide::Buy));
        assert_eq!(fill.order_id, "61e69015");
        assert_eq!(fill.fill_price, None);
        assert_eq!(fill.quantity, 2.5);
    }

    #[test]
    fn filled_order_parses_average_price() {
        let body = r#"{"id":"a1","status":"filled","filled_avg_price":"189.87"}"#;
        let resp: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.into_fill(&order(OrderSide::Buy)).fill_price, Some(189.87));
    }

    #[test]
    fn orders_url_joins_onto_base() {
        let client = AlpacaClient::new(&config("https://paper-api.alpaca.markets/")).unwrap();
        assert_eq!(
            client.orders_url().unwrap().as_str(),
            "https://paper-api.alpaca.markets/v2/orders"
        );
    }

    #[tokio::test]
    async fn stalled_broker_times_out() {
        // Accepts the connection and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client =
            AlpacaClient::with_timeout(&config(&format!("http://{addr}/")), Duration::from_millis(200))
                .unwrap();
        let started = std::time::Instant::now();
        let err = client.submit_order(&order(OrderSide::Buy)).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
        server.abort();
    }
}
