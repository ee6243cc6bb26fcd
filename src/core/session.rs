// src/core/session.rs
use crate::config::SessionConfig;
use crate::core::order::{Draw, Order};
use crate::core::retry::RetryingCaller;
use crate::error::{BrokerError, BrokerResult};
use crate::logging::EventLog;
use crate::market::{FixedPayout, MarketFeed, PayoutEstimator, SyntheticMarket};
use crate::types::{AccountType, Candle, MarketDepth, OrderId, OrderStatus, Quote, Side};
use crate::utils::precision::checked_debit;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::span::EnteredSpan;
use tracing::{debug, info_span};
use uuid::Uuid;

#[derive(Debug)]
struct Account {
    balance: Decimal,
    orders: BTreeMap<OrderId, Order>,
    next_order_id: OrderId,
}

/// Simulated binary-options account.
///
/// Every public operation goes through the [`RetryingCaller`]. Balance is only
/// ever changed together with an order transition: debit on placement, credit
/// on a win or a cancel.
///
/// Not internally synchronized. Hosts sharing a session across tasks must hold
/// one lock for the whole call (see `connectors::simulated`).
pub struct AccountSession<R = StdRng> {
    id: Uuid,
    account_type: AccountType,
    account: Account,
    symbols: Vec<String>,
    caller: RetryingCaller,
    market: Box<dyn MarketFeed>,
    payout: Box<dyn PayoutEstimator>,
    log: Arc<dyn EventLog>,
    rng: R,
}

impl AccountSession<StdRng> {
    /// Builds a session on the synthetic market, seeded from `config.seed` when
    /// present.
    pub fn from_config(config: &SessionConfig, log: Arc<dyn EventLog>) -> BrokerResult<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng, log)
    }
}

impl<R: RngCore> AccountSession<R> {
    pub fn new(config: &SessionConfig, rng: R, log: Arc<dyn EventLog>) -> BrokerResult<Self> {
        let payout = FixedPayout::new(config.payout_rate)?;
        Self::with_collaborators(
            config,
            rng,
            log,
            Box::new(SyntheticMarket::new()),
            Box::new(payout),
        )
    }

    pub fn with_collaborators(
        config: &SessionConfig,
        rng: R,
        log: Arc<dyn EventLog>,
        market: Box<dyn MarketFeed>,
        payout: Box<dyn PayoutEstimator>,
    ) -> BrokerResult<Self> {
        config.validate()?;
        let caller = RetryingCaller::new(config.fail_chance, config.max_retries)?;
        let id = Uuid::new_v4();
        debug!(session = %id, account_type = ?config.account_type, "Session created");

        Ok(Self {
            id,
            account_type: config.account_type,
            account: Account {
                balance: config.starting_balance(),
                orders: BTreeMap::new(),
                next_order_id: 0,
            },
            symbols: config.symbols.clone(),
            caller,
            market,
            payout,
            log,
            rng,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Entered for the duration of each operation so every event it emits
    /// carries the session id.
    fn span(&self) -> EnteredSpan {
        info_span!("session", id = %self.id).entered()
    }

    fn ensure_symbol(&self, symbol: &str) -> BrokerResult<()> {
        if self.symbols.iter().any(|s| s == symbol) {
            Ok(())
        } else {
            Err(BrokerError::SymbolNotFound(symbol.to_string()))
        }
    }

    pub fn balance(&mut self) -> BrokerResult<Decimal> {
        let _span = self.span();
        let balance = self.account.balance;
        self.caller.call(&mut self.rng, &*self.log, |_| Ok(balance))
    }

    pub fn get_real_time_quote(&mut self, symbol: &str) -> BrokerResult<Quote> {
        let _span = self.span();
        self.ensure_symbol(symbol)?;
        let market = &self.market;
        self.caller
            .call(&mut self.rng, &*self.log, |rng| market.quote(symbol, rng))
    }

    pub fn get_history(
        &mut self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BrokerResult<Vec<Candle>> {
        let _span = self.span();
        self.ensure_symbol(symbol)?;
        self.market.check_range(start, end)?;
        let market = &self.market;
        self.caller.call(&mut self.rng, &*self.log, |rng| {
            market.history(symbol, start, end, rng)
        })
    }

    pub fn get_payout_estimate(&mut self, symbol: &str) -> BrokerResult<Decimal> {
        let _span = self.span();
        self.ensure_symbol(symbol)?;
        let payout = &self.payout;
        self.caller
            .call(&mut self.rng, &*self.log, |_| payout.payout_rate(symbol))
    }

    /// Generates one depth snapshot, hands it to `on_update` and returns it.
    pub fn stream_market_depth<F>(&mut self, symbol: &str, on_update: F) -> BrokerResult<MarketDepth>
    where
        F: FnOnce(&MarketDepth),
    {
        let _span = self.span();
        self.ensure_symbol(symbol)?;
        let market = &self.market;
        self.caller.call(&mut self.rng, &*self.log, |rng| {
            let depth = market.depth(symbol, rng)?;
            on_update(&depth);
            Ok(depth)
        })
    }

    /// Opens an order and reserves its stake from the balance.
    pub fn place_order(
        &mut self,
        symbol: &str,
        direction: Side,
        amount: Decimal,
    ) -> BrokerResult<OrderId> {
        self.ensure_symbol(symbol)?;
        if amount <= Decimal::ZERO {
            return Err(BrokerError::invalid("amount must be positive"));
        }

        let _span = self.span();
        let account = &mut self.account;
        let log = &*self.log;
        self.caller.call(&mut self.rng, log, |_| {
            let balance = checked_debit(account.balance, amount)?;
            let id = account.next_order_id + 1;
            account
                .orders
                .insert(id, Order::new(id, symbol.to_string(), direction, amount));
            account.next_order_id = id;
            account.balance = balance;
            log.info(&format!("Order {} placed", id));
            Ok(id)
        })
    }

    /// Reports an order's status, resolving it first if it is still open.
    ///
    /// An open order draws win, loss or still-open with equal odds. Once a
    /// terminal status is reached the stored `(status, result)` is returned
    /// unchanged on every later call.
    pub fn check_order_status(&mut self, order_id: OrderId) -> BrokerResult<(OrderStatus, Decimal)> {
        let _span = self.span();
        let account = &mut self.account;
        let payout = &self.payout;
        let log = &*self.log;
        self.caller.call(&mut self.rng, log, |rng| {
            let order = account
                .orders
                .get_mut(&order_id)
                .ok_or(BrokerError::OrderNotFound(order_id))?;
            if order.status == OrderStatus::Open {
                let draw = Draw::sample(rng);
                let rate = match draw {
                    Draw::Win => payout.payout_rate(&order.symbol)?,
                    _ => Decimal::ZERO,
                };
                account.balance = order.settle(draw, rate, account.balance)?;
                let (status, result) = (order.status, order.result);
                if status.is_terminal() {
                    log.info(&format!("Order {} resolved: {} ({})", order_id, status, result));
                }
                return Ok((status, result));
            }
            Ok((order.status, order.result))
        })
    }

    /// Cancels an open order and returns its stake.
    pub fn cancel_order(&mut self, order_id: OrderId) -> BrokerResult<bool> {
        let _span = self.span();
        let account = &mut self.account;
        let log = &*self.log;
        self.caller.call(&mut self.rng, log, |_| {
            let order = account
                .orders
                .get_mut(&order_id)
                .ok_or(BrokerError::OrderNotFound(order_id))?;
            account.balance = order.cancel(account.balance)?;
            log.info(&format!("Order {} cancelled", order_id));
            Ok(true)
        })
    }

    /// Snapshot of a single order.
    pub fn order(&mut self, order_id: OrderId) -> BrokerResult<Order> {
        let _span = self.span();
        let orders = &self.account.orders;
        self.caller.call(&mut self.rng, &*self.log, |_| {
            orders
                .get(&order_id)
                .cloned()
                .ok_or(BrokerError::OrderNotFound(order_id))
        })
    }

    /// Every order placed so far, by ascending id.
    pub fn orders(&mut self) -> BrokerResult<Vec<Order>> {
        let _span = self.span();
        let orders = &self.account.orders;
        self.caller
            .call(&mut self.rng, &*self.log, |_| Ok(orders.values().cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLog};

    fn session(fail_chance: f64, max_retries: u32, seed: u64) -> (AccountSession, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        let config = SessionConfig {
            fail_chance,
            max_retries,
            ..SessionConfig::default()
        };
        let s = AccountSession::new(&config, StdRng::seed_from_u64(seed), log.clone()).unwrap();
        (s, log)
    }

    #[test]
    fn ids_are_monotonic_from_one() {
        let (mut s, _) = session(0.0, 1, 1);
        let a = s.place_order("EURUSD", Side::Buy, Decimal::from(1)).unwrap();
        let b = s.place_order("USDJPY", Side::Sell, Decimal::from(1)).unwrap();
        let c = s.place_order("GBPUSD", Side::Buy, Decimal::from(1)).unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn place_debits_exactly_once() {
        let (mut s, log) = session(0.0, 1, 2);
        s.place_order("EURUSD", Side::Buy, Decimal::new(1050, 2)).unwrap();
        assert_eq!(s.balance().unwrap(), Decimal::new(98950, 2));
        assert_eq!(log.lines()[0], (Level::Info, "Order 1 placed".to_string()));
    }

    #[test]
    fn unknown_symbol_beats_failure_injection() {
        let (mut s, _) = session(1.0, 1, 3);
        assert_eq!(
            s.get_real_time_quote("INVALID"),
            Err(BrokerError::SymbolNotFound("INVALID".to_string()))
        );
        assert!(matches!(
            s.place_order("INVALID", Side::Buy, Decimal::ONE),
            Err(BrokerError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn non_positive_amount_rejected() {
        let (mut s, _) = session(0.0, 1, 4);
        for amount in [Decimal::ZERO, Decimal::from(-5)] {
            assert!(matches!(
                s.place_order("EURUSD", Side::Buy, amount),
                Err(BrokerError::InvalidArgument(_))
            ));
        }
        assert!(s.orders().unwrap().is_empty());
        assert_eq!(s.balance().unwrap(), Decimal::from(1000));
    }

    #[test]
    fn rejected_attempt_leaves_no_trace() {
        let (mut s, _) = session(1.0, 1, 5);
        assert_eq!(
            s.place_order("EURUSD", Side::Buy, Decimal::from(10)),
            Err(BrokerError::ApiUnavailable { attempts: 1 })
        );
        assert!(s.account.orders.is_empty());
        assert_eq!(s.account.next_order_id, 0);
        assert_eq!(s.account.balance, Decimal::from(1000));
    }

    #[test]
    fn resolution_credits_match_outcome() {
        let (mut s, _) = session(0.0, 1, 6);
        for _ in 0..30 {
            let before = s.balance().unwrap();
            let id = s.place_order("EURUSD", Side::Sell, Decimal::from(10)).unwrap();

            let (status, result) = loop {
                let (status, result) = s.check_order_status(id).unwrap();
                if status != OrderStatus::Open {
                    break (status, result);
                }
                assert_eq!(result, Decimal::ZERO);
            };

            let after = s.balance().unwrap();
            match status {
                OrderStatus::Win => {
                    assert_eq!(result, Decimal::from(8));
                    assert_eq!(after, before + Decimal::from(8));
                }
                OrderStatus::Loss => {
                    assert_eq!(result, Decimal::from(-10));
                    assert_eq!(after, before - Decimal::from(10));
                }
                other => panic!("unexpected status {}", other),
            }
        }
    }

    #[test]
    fn order_snapshot_reflects_cancel() {
        let (mut s, _) = session(0.0, 1, 7);
        let id = s.place_order("GBPUSD", Side::Buy, Decimal::from(3)).unwrap();
        s.cancel_order(id).unwrap();

        let order = s.order(id).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.result, Decimal::ZERO);
        assert_eq!(s.order(99), Err(BrokerError::OrderNotFound(99)));
    }

    #[test]
    fn depth_callback_receives_snapshot() {
        let (mut s, _) = session(0.0, 1, 8);
        let mut seen = None;
        let depth = s
            .stream_market_depth("EURUSD", |d| seen = Some(*d))
            .unwrap();
        assert_eq!(seen, Some(depth));
    }

    #[test]
    fn real_account_can_go_negative() {
        let log = Arc::new(MemoryLog::new());
        let config = SessionConfig {
            account_type: AccountType::Real,
            ..SessionConfig::default()
        };
        let mut s = AccountSession::new(&config, StdRng::seed_from_u64(9), log).unwrap();
        assert_eq!(s.balance().unwrap(), Decimal::ZERO);
        s.place_order("EURUSD", Side::Buy, Decimal::from(5)).unwrap();
        assert_eq!(s.balance().unwrap(), Decimal::from(-5));
    }

    #[test]
    fn overflowing_stake_is_rejected_without_side_effects() {
        let (mut s, _) = session(0.0, 1, 10);
        let first = s.place_order("EURUSD", Side::Buy, Decimal::MAX).unwrap();
        let after_first = Decimal::from(1000) - Decimal::MAX;

        assert!(matches!(
            s.place_order("EURUSD", Side::Buy, Decimal::MAX),
            Err(BrokerError::InvalidArgument(_))
        ));
        assert_eq!(s.balance().unwrap(), after_first);
        assert_eq!(s.orders().unwrap().len(), 1);
        assert_eq!(s.account.next_order_id, first);

        let next = s.place_order("EURUSD", Side::Buy, Decimal::ONE).unwrap();
        assert_eq!(next, first + 1);
    }

    #[test]
    fn overflowing_win_keeps_order_open_and_cancellable() {
        let mut overflowed = 0;
        for seed in 0..20 {
            let (mut s, _) = session(0.0, 1, 100 + seed);
            let id = s.place_order("USDJPY", Side::Sell, Decimal::MAX).unwrap();
            let reserved = Decimal::from(1000) - Decimal::MAX;

            for _ in 0..100 {
                match s.check_order_status(id) {
                    Ok((OrderStatus::Open, _)) => continue,
                    Ok((OrderStatus::Loss, result)) => {
                        assert_eq!(result, -Decimal::MAX);
                        assert_eq!(s.balance().unwrap(), reserved);
                        break;
                    }
                    Err(BrokerError::InvalidArgument(_)) => {
                        overflowed += 1;
                        assert_eq!(s.order(id).unwrap().status, OrderStatus::Open);
                        assert_eq!(s.balance().unwrap(), reserved);
                        assert_eq!(s.cancel_order(id), Ok(true));
                        assert_eq!(s.balance().unwrap(), Decimal::from(1000));
                        break;
                    }
                    other => panic!("unexpected outcome {:?}", other),
                }
            }
        }
        assert!(overflowed > 0);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn events_carry_session_id() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut s = AccountSession::new(
            &SessionConfig::default(),
            StdRng::seed_from_u64(11),
            Arc::new(crate::logging::TracingLog),
        )
        .unwrap();
        tracing::subscriber::with_default(subscriber, || {
            s.place_order("EURUSD", Side::Buy, Decimal::ONE).unwrap();
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let line = output
            .lines()
            .find(|l| l.contains("Order 1 placed"))
            .unwrap();
        assert!(line.contains(&format!("session{{id={}}}", s.id())));
    }
}
