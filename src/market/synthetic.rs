// src/market/synthetic.rs
use crate::error::{BrokerError, BrokerResult};
use crate::market::{MarketFeed, PayoutEstimator};
use crate::types::{Candle, MarketDepth, Quote};
use crate::utils::precision::{normalize_price, unit_fraction, PRICE_TICK};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore};
use rust_decimal::Decimal;

/// Largest number of candles one history request may produce.
pub const MAX_HISTORY_CANDLES: i64 = 10_000;

/// Random-walk price generator. Quotes sit just above 1.0; history starts at
/// 1.0 and carries each close into the next open.
#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    base_price: Decimal,
    interval: Duration,
}

impl SyntheticMarket {
    pub fn new() -> Self {
        Self {
            base_price: Decimal::ONE,
            interval: Duration::minutes(1),
        }
    }

    /// Candles in `start..=end`, one per interval.
    fn candle_count(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        (end - start).num_seconds() / self.interval.num_seconds() + 1
    }

    fn fraction(rng: &mut dyn RngCore) -> Decimal {
        unit_fraction(rng.gen_range(0..1_000_000))
    }
}

impl Default for SyntheticMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketFeed for SyntheticMarket {
    fn quote(&self, symbol: &str, rng: &mut dyn RngCore) -> BrokerResult<Quote> {
        let price = self.base_price + Self::fraction(rng) / Decimal::ONE_HUNDRED;
        Ok(Quote {
            symbol: symbol.to_string(),
            price: normalize_price(price, PRICE_TICK),
            time: Utc::now(),
        })
    }

    fn check_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> BrokerResult<()> {
        if start >= end {
            return Err(BrokerError::invalid("start_date must be before end_date"));
        }
        let count = self.candle_count(start, end);
        if count > MAX_HISTORY_CANDLES {
            return Err(BrokerError::invalid(format!(
                "range spans {} candles, at most {} allowed",
                count, MAX_HISTORY_CANDLES
            )));
        }
        Ok(())
    }

    fn history(
        &self,
        _symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rng: &mut dyn RngCore,
    ) -> BrokerResult<Vec<Candle>> {
        self.check_range(start, end)?;

        let mut candles = Vec::with_capacity(self.candle_count(start, end) as usize);
        let mut current = start;
        let mut price = self.base_price;
        let thousand = Decimal::ONE_THOUSAND;

        while current <= end {
            let open = price;
            let high = open + Self::fraction(rng) / thousand;
            let low = open - Self::fraction(rng) / thousand;
            let close = low + Self::fraction(rng) * (high - low);
            let volume = rng.gen_range(100..=500);

            candles.push(Candle {
                time: current,
                open: normalize_price(open, PRICE_TICK),
                high: normalize_price(high, PRICE_TICK),
                low: normalize_price(low, PRICE_TICK),
                close: normalize_price(close, PRICE_TICK),
                volume,
            });

            current += self.interval;
            price = close;
        }
        Ok(candles)
    }

    fn depth(&self, _symbol: &str, rng: &mut dyn RngCore) -> BrokerResult<MarketDepth> {
        Ok(MarketDepth {
            bid: rng.gen_range(1..=5),
            ask: rng.gen_range(1..=5),
        })
    }
}

/// Same payout rate for every symbol.
#[derive(Debug, Clone, Copy)]
pub struct FixedPayout {
    rate: Decimal,
}

impl FixedPayout {
    pub fn new(rate: Decimal) -> BrokerResult<Self> {
        if rate <= Decimal::ZERO || rate > Decimal::ONE {
            return Err(BrokerError::invalid(format!(
                "payout rate must be within (0, 1], got {}",
                rate
            )));
        }
        Ok(Self { rate })
    }
}

impl Default for FixedPayout {
    fn default() -> Self {
        Self {
            rate: Decimal::new(80, 2),
        }
    }
}

impl PayoutEstimator for FixedPayout {
    fn payout_rate(&self, _symbol: &str) -> BrokerResult<Decimal> {
        Ok(self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, min, 0).unwrap()
    }

    #[test]
    fn quote_stays_in_band() {
        let market = SyntheticMarket::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let q = market.quote("EURUSD", &mut rng).unwrap();
            assert_eq!(q.symbol, "EURUSD");
            assert!(q.price >= Decimal::ONE);
            assert!(q.price <= Decimal::new(101, 2));
            assert!(q.price.scale() <= 6);
        }
    }

    #[test]
    fn history_is_inclusive_minute_bars() {
        let market = SyntheticMarket::new();
        let mut rng = StdRng::seed_from_u64(8);
        let candles = market.history("EURUSD", at(0), at(2), &mut rng).unwrap();

        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].time, at(0));
        assert_eq!(candles[2].time, at(2));
        assert_eq!(candles[0].open, Decimal::ONE);
    }

    #[test]
    fn candles_are_well_formed() {
        let market = SyntheticMarket::new();
        let mut rng = StdRng::seed_from_u64(9);
        let candles = market.history("USDJPY", at(0), at(30), &mut rng).unwrap();

        for c in &candles {
            assert!(c.low <= c.open && c.open <= c.high);
            assert!(c.low <= c.close && c.close <= c.high);
            assert!((100..=500).contains(&c.volume));
        }
        for pair in candles.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[test]
    fn reversed_range_is_invalid() {
        let market = SyntheticMarket::new();
        let mut rng = StdRng::seed_from_u64(10);
        assert!(matches!(
            market.history("EURUSD", at(5), at(5), &mut rng),
            Err(BrokerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn oversized_range_is_invalid() {
        let market = SyntheticMarket::new();
        let mut rng = StdRng::seed_from_u64(13);
        let start = at(0);
        let last = start + Duration::minutes(MAX_HISTORY_CANDLES - 1);

        let candles = market.history("EURUSD", start, last, &mut rng).unwrap();
        assert_eq!(candles.len() as i64, MAX_HISTORY_CANDLES);

        assert!(matches!(
            market.history("EURUSD", start, last + Duration::minutes(1), &mut rng),
            Err(BrokerError::InvalidArgument(_))
        ));
        assert!(matches!(
            market.history("EURUSD", start, start + Duration::days(365 * 200), &mut rng),
            Err(BrokerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn depth_levels_within_range() {
        let market = SyntheticMarket::new();
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..50 {
            let d = market.depth("GBPUSD", &mut rng).unwrap();
            assert!((1..=5).contains(&d.bid));
            assert!((1..=5).contains(&d.ask));
        }
    }

    #[test]
    fn payout_rate_bounds() {
        assert!(FixedPayout::new(Decimal::ZERO).is_err());
        assert!(FixedPayout::new(Decimal::new(101, 2)).is_err());
        assert!(FixedPayout::new(Decimal::ONE).is_ok());
        assert_eq!(
            FixedPayout::default().payout_rate("EURUSD").unwrap(),
            Decimal::new(8, 1)
        );
    }
}
