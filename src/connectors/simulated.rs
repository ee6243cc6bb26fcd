// src/connectors/simulated.rs
use crate::connectors::traits::BrokerClient;
use crate::core::order::Order;
use crate::core::session::AccountSession;
use crate::error::BrokerResult;
use crate::types::{Candle, MarketDepth, OrderId, OrderStatus, Quote, Side};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Async front for an [`AccountSession`].
///
/// The session lock is held for the whole operation, retry loop included, so
/// concurrent callers are serialized and never observe a half-applied
/// transition.
pub struct SimulatedBroker<R = rand::rngs::StdRng> {
    session: Arc<Mutex<AccountSession<R>>>,
}

impl<R> Clone for SimulatedBroker<R> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

impl<R> SimulatedBroker<R>
where
    R: RngCore + Send + 'static,
{
    pub fn new(session: AccountSession<R>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

#[async_trait]
impl<R> BrokerClient for SimulatedBroker<R>
where
    R: RngCore + Send + 'static,
{
    async fn balance(&self) -> BrokerResult<Decimal> {
        self.session.lock().await.balance()
    }

    async fn get_real_time_quote(&self, symbol: &str) -> BrokerResult<Quote> {
        self.session.lock().await.get_real_time_quote(symbol)
    }

    async fn get_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BrokerResult<Vec<Candle>> {
        self.session.lock().await.get_history(symbol, start, end)
    }

    async fn get_payout_estimate(&self, symbol: &str) -> BrokerResult<Decimal> {
        self.session.lock().await.get_payout_estimate(symbol)
    }

    async fn market_depth(&self, symbol: &str) -> BrokerResult<MarketDepth> {
        self.session
            .lock()
            .await
            .stream_market_depth(symbol, |_| {})
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
    ) -> BrokerResult<OrderId> {
        self.session.lock().await.place_order(symbol, side, amount)
    }

    async fn check_order_status(&self, order_id: OrderId) -> BrokerResult<(OrderStatus, Decimal)> {
        self.session.lock().await.check_order_status(order_id)
    }

    async fn cancel_order(&self, order_id: OrderId) -> BrokerResult<bool> {
        self.session.lock().await.cancel_order(order_id)
    }

    async fn order(&self, order_id: OrderId) -> BrokerResult<Order> {
        self.session.lock().await.order(order_id)
    }

    async fn orders(&self) -> BrokerResult<Vec<Order>> {
        self.session.lock().await.orders()
    }

    async fn symbols(&self) -> Vec<String> {
        self.session.lock().await.symbols().to_vec()
    }
}
