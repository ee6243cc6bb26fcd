// src/utils/precision.rs
use crate::error::{BrokerError, BrokerResult};
use rust_decimal::Decimal;

/// Smallest price increment produced by the synthetic feed (six decimals).
pub const PRICE_TICK: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Rounds price to the NEAREST multiple of tick_size.
/// Example: price=100.16, tick=0.1 -> 100.2
pub fn normalize_price(price: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size.is_zero() {
        return price;
    }
    ((price / tick_size).round() * tick_size).normalize()
}

/// Fraction in [0, 1) with six decimals, from an integer draw in 0..1_000_000.
pub fn unit_fraction(micros: u32) -> Decimal {
    Decimal::new(i64::from(micros % 1_000_000), 6)
}

/// `balance + amount`, or `InvalidArgument` when it leaves the Decimal range.
pub fn checked_credit(balance: Decimal, amount: Decimal) -> BrokerResult<Decimal> {
    balance
        .checked_add(amount)
        .ok_or_else(|| BrokerError::invalid(format!("crediting {} overflows the balance", amount)))
}

/// `balance - amount`, or `InvalidArgument` when it leaves the Decimal range.
pub fn checked_debit(balance: Decimal, amount: Decimal) -> BrokerResult<Decimal> {
    balance
        .checked_sub(amount)
        .ok_or_else(|| BrokerError::invalid(format!("debiting {} overflows the balance", amount)))
}
