// src/core/engine.rs
use crate::config::DemoConfig;
use crate::connectors::traits::BrokerClient;
use crate::error::BrokerError;
use crate::types::{OrderId, OrderStatus, Quote, Side, UiEvent};
use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Cancel attempts per open order, and balance reads at the end of a run,
/// before an outage is given up on.
const WIND_DOWN_ATTEMPTS: u32 = 16;

/// Totals collected over one demo run.
///
/// `placed == wins + losses + cancelled + open` always holds; `open` counts
/// orders the engine could not settle or cancel through outages.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub placed: u32,
    pub wins: u32,
    pub losses: u32,
    pub cancelled: u32,
    pub open: u32,
    pub unavailable: u32,
    pub final_balance: Decimal,
}

impl RunSummary {
    fn record(&mut self, status: OrderStatus) {
        match status {
            OrderStatus::Win => self.wins += 1,
            OrderStatus::Loss => self.losses += 1,
            OrderStatus::Cancelled => self.cancelled += 1,
            OrderStatus::Open => self.open += 1,
        }
    }
}

/// Drives a broker through a few rounds of quote, place, poll, cancel.
pub struct DemoEngine<B> {
    config: DemoConfig,
    broker: B,
    ui_sender: Option<mpsc::Sender<UiEvent>>,
    last_quotes: HashMap<String, Decimal>,
    unsettled: Vec<OrderId>,
}

impl<B> DemoEngine<B>
where
    B: BrokerClient,
{
    pub fn new(config: DemoConfig, broker: B, ui_sender: Option<mpsc::Sender<UiEvent>>) -> Self {
        Self {
            config,
            broker,
            ui_sender,
            last_quotes: HashMap::new(),
            unsettled: Vec::new(),
        }
    }

    fn send_ui_event(&self, event: UiEvent) {
        let Some(sender) = &self.ui_sender else {
            return;
        };
        match sender.try_send(event) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("UI Channel closed! Interface is likely dead.");
            }
        }
    }

    /// Up-tick means buy, down-tick sell. First sighting of a symbol buys.
    fn pick_side(&mut self, quote: &Quote) -> Side {
        let prev = self.last_quotes.insert(quote.symbol.clone(), quote.price);
        match prev {
            Some(p) if quote.price < p => Side::Sell,
            _ => Side::Buy,
        }
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        info!("Demo engine starting: {} round(s)", self.config.rounds);
        let mut summary = RunSummary::default();
        let symbols = self.broker.symbols().await;

        for round in 1..=self.config.rounds {
            info!("Round {}", round);
            for symbol in &symbols {
                if let Err(e) = self.trade_once(symbol, &mut summary).await {
                    if e.is_retryable() {
                        warn!("⚠️ {} skipped this round: {}", symbol, e);
                        summary.unavailable += 1;
                    } else {
                        return Err(e.into());
                    }
                }
            }
        }

        self.wind_down(&mut summary).await?;
        summary.final_balance = self.final_balance().await?;
        self.send_ui_event(UiEvent::BalanceUpdate(summary.final_balance));
        info!("Demo finished: {:?}", summary);
        Ok(summary)
    }

    async fn trade_once(&mut self, symbol: &str, summary: &mut RunSummary) -> Result<(), BrokerError> {
        let quote = self.broker.get_real_time_quote(symbol).await?;
        self.send_ui_event(UiEvent::QuoteUpdate(quote.clone()));

        let side = self.pick_side(&quote);
        let order_id = self
            .broker
            .place_order(symbol, side, self.config.stake)
            .await?;
        summary.placed += 1;
        info!("🚀 Placed {} {} {} @ {}", side, self.config.stake, symbol, quote.price);
        self.report_order(order_id).await;

        // Past this point the stake is committed: outages are absorbed so the
        // order is never abandoned open.
        let status = self.await_resolution(order_id).await?;
        if status == OrderStatus::Open {
            self.unsettled.push(order_id);
        }
        summary.record(status);
        self.report_order(order_id).await;

        if let Ok(balance) = self.broker.balance().await {
            self.send_ui_event(UiEvent::BalanceUpdate(balance));
        }
        Ok(())
    }

    /// Polls until the order leaves `open`; cancels it after `max_polls` checks.
    ///
    /// Unavailable checks still use up a poll. Returns `Open` only when every
    /// cancel attempt hit an outage.
    async fn await_resolution(&self, order_id: OrderId) -> Result<OrderStatus, BrokerError> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        for _ in 0..self.config.max_polls {
            match self.broker.check_order_status(order_id).await {
                Ok((status, result)) if status.is_terminal() => {
                    info!("Order {} -> {} ({})", order_id, status, result);
                    return Ok(status);
                }
                Ok(_) => {}
                Err(e) if e.is_retryable() => {
                    warn!("Status check for order {} failed: {}", order_id, e);
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(interval).await;
        }
        self.cancel_open(order_id).await
    }

    async fn cancel_open(&self, order_id: OrderId) -> Result<OrderStatus, BrokerError> {
        for _ in 0..WIND_DOWN_ATTEMPTS {
            match self.broker.cancel_order(order_id).await {
                Ok(_) => {
                    info!("Order {} still open, cancelled", order_id);
                    return Ok(OrderStatus::Cancelled);
                }
                // A status check that did land before an outage may have
                // resolved the order already.
                Err(BrokerError::OrderConflict { status, .. }) => return Ok(status),
                Err(e) if e.is_retryable() => {
                    warn!("Cancel of order {} failed: {}", order_id, e);
                }
                Err(e) => return Err(e),
            }
        }
        warn!("Order {} left open after {} cancel attempts", order_id, WIND_DOWN_ATTEMPTS);
        Ok(OrderStatus::Open)
    }

    /// Makes one more cancel pass over orders left open by earlier outages.
    async fn wind_down(&mut self, summary: &mut RunSummary) -> Result<(), BrokerError> {
        let pending = std::mem::take(&mut self.unsettled);
        for order_id in pending {
            let status = self.cancel_open(order_id).await?;
            if status == OrderStatus::Open {
                self.unsettled.push(order_id);
                continue;
            }
            summary.open -= 1;
            summary.record(status);
            self.report_order(order_id).await;
        }
        Ok(())
    }

    async fn final_balance(&self) -> Result<Decimal, BrokerError> {
        let mut attempt = 1;
        loop {
            match self.broker.balance().await {
                Err(e) if e.is_retryable() && attempt < WIND_DOWN_ATTEMPTS => attempt += 1,
                other => return other,
            }
        }
    }

    async fn report_order(&self, order_id: OrderId) {
        match self.broker.order(order_id).await {
            Ok(order) => self.send_ui_event(UiEvent::OrderUpdate(order)),
            Err(e) => warn!("Could not load order {}: {}", order_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::connectors::simulated::SimulatedBroker;
    use crate::core::session::AccountSession;
    use crate::logging::MemoryLog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn broker(fail_chance: f64, max_retries: u32) -> SimulatedBroker {
        let config = SessionConfig {
            fail_chance,
            max_retries,
            ..SessionConfig::default()
        };
        let session = AccountSession::new(
            &config,
            StdRng::seed_from_u64(21),
            Arc::new(MemoryLog::new()),
        )
        .unwrap();
        SimulatedBroker::new(session)
    }

    fn fast_config() -> DemoConfig {
        DemoConfig {
            rounds: 3,
            poll_interval_ms: 0,
            max_polls: 2,
            ..DemoConfig::default()
        }
    }

    #[tokio::test]
    async fn every_order_ends_accounted_for() {
        let (tx, mut rx) = mpsc::channel(256);
        let mut engine = DemoEngine::new(fast_config(), broker(0.0, 1), Some(tx));
        let summary = engine.run().await.unwrap();

        assert_eq!(summary.placed, 9);
        assert_eq!(summary.wins + summary.losses + summary.cancelled, 9);
        assert_eq!(summary.open, 0);
        assert_eq!(summary.unavailable, 0);

        let expected = Decimal::from(1000) + Decimal::from(summary.wins) * Decimal::from(8)
            - Decimal::from(summary.losses) * Decimal::from(10);
        assert_eq!(summary.final_balance, expected);

        let mut saw_order = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, UiEvent::OrderUpdate(_)) {
                saw_order = true;
            }
        }
        assert!(saw_order);
    }

    #[tokio::test]
    async fn flaky_broker_leaves_no_order_open() {
        let config = DemoConfig {
            rounds: 10,
            ..fast_config()
        };
        let broker = broker(0.4, 1);
        let mut engine = DemoEngine::new(config, broker.clone(), None);
        let summary = engine.run().await.unwrap();

        assert!(summary.placed > 0);
        assert!(summary.unavailable > 0);
        assert_eq!(summary.open, 0);
        assert_eq!(
            summary.wins + summary.losses + summary.cancelled,
            summary.placed
        );
        let expected = Decimal::from(1000) + Decimal::from(summary.wins) * Decimal::from(8)
            - Decimal::from(summary.losses) * Decimal::from(10);
        assert_eq!(summary.final_balance, expected);

        let orders = loop {
            if let Ok(orders) = broker.orders().await {
                break orders;
            }
        };
        assert_eq!(orders.len() as u32, summary.placed);
        assert!(orders.iter().all(|o| o.status.is_terminal()));
    }

    #[tokio::test]
    async fn unavailable_broker_surfaces_on_balance() {
        let mut engine = DemoEngine::new(fast_config(), broker(1.0, 1), None);
        let err = engine.run().await.unwrap_err();
        let broker_err = err.downcast_ref::<BrokerError>().unwrap();
        assert!(broker_err.is_retryable());
    }

    #[test]
    fn side_follows_quote_direction() {
        let mut engine = DemoEngine::new(fast_config(), broker(0.0, 1), None);
        let mut quote = Quote {
            symbol: "EURUSD".to_string(),
            price: Decimal::new(1005, 3),
            time: chrono::Utc::now(),
        };
        assert_eq!(engine.pick_side(&quote), Side::Buy);
        quote.price = Decimal::new(1004, 3);
        assert_eq!(engine.pick_side(&quote), Side::Sell);
        quote.price = Decimal::new(1006, 3);
        assert_eq!(engine.pick_side(&quote), Side::Buy);
    }
}
