// src/market/mod.rs
//! Market data collaborators consumed by the session.
//!
//! The session validates symbols and date ranges before calling into these, so
//! implementations only generate data. None of them may touch account state.

use crate::error::{BrokerError, BrokerResult};
use crate::types::{Candle, MarketDepth, Quote};
use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;

pub mod synthetic;

pub use synthetic::{FixedPayout, SyntheticMarket, MAX_HISTORY_CANDLES};

pub trait MarketFeed: Send + Sync {
    fn quote(&self, symbol: &str, rng: &mut dyn RngCore) -> BrokerResult<Quote>;

    /// Rejects a history range this feed will not serve. Called before any
    /// failure injection, so bad ranges are reported deterministically.
    fn check_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> BrokerResult<()> {
        if start >= end {
            return Err(BrokerError::invalid("start_date must be before end_date"));
        }
        Ok(())
    }

    /// Ordered candles covering `start..=end`.
    fn history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rng: &mut dyn RngCore,
    ) -> BrokerResult<Vec<Candle>>;

    fn depth(&self, symbol: &str, rng: &mut dyn RngCore) -> BrokerResult<MarketDepth>;
}

pub trait PayoutEstimator: Send + Sync {
    /// Profit fraction in (0, 1] paid on a winning stake.
    fn payout_rate(&self, symbol: &str) -> BrokerResult<Decimal>;
}
