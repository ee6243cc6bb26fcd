use crate::core::order::Order;
use crate::error::BrokerResult;
use crate::types::{Candle, MarketDepth, OrderId, OrderStatus, Quote, Side};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Broker surface as seen by async hosts.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn balance(&self) -> BrokerResult<Decimal>;

    async fn get_real_time_quote(&self, symbol: &str) -> BrokerResult<Quote>;

    async fn get_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BrokerResult<Vec<Candle>>;

    async fn get_payout_estimate(&self, symbol: &str) -> BrokerResult<Decimal>;

    async fn market_depth(&self, symbol: &str) -> BrokerResult<MarketDepth>;

    async fn place_order(&self, symbol: &str, side: Side, amount: Decimal)
        -> BrokerResult<OrderId>;

    async fn check_order_status(&self, order_id: OrderId) -> BrokerResult<(OrderStatus, Decimal)>;

    async fn cancel_order(&self, order_id: OrderId) -> BrokerResult<bool>;

    async fn order(&self, order_id: OrderId) -> BrokerResult<Order>;

    async fn orders(&self) -> BrokerResult<Vec<Order>>;

    async fn symbols(&self) -> Vec<String>;
}
