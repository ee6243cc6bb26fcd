// src/core/order.rs
use crate::error::{BrokerError, BrokerResult};
use crate::types::{OrderId, OrderStatus, Side};
use crate::utils::precision::checked_credit;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub direction: Side,
    pub amount: Decimal,
    pub status: OrderStatus,
    /// Net payout on a win, negative stake on a loss, zero otherwise.
    pub result: Decimal,
}

/// Outcome of one resolution attempt on an open order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draw {
    Win,
    Loss,
    Pending,
}

impl Draw {
    /// Uniform three-way choice.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3u8) {
            0 => Draw::Win,
            1 => Draw::Loss,
            _ => Draw::Pending,
        }
    }
}

impl Order {
    pub fn new(id: OrderId, symbol: String, direction: Side, amount: Decimal) -> Self {
        Self {
            id,
            symbol,
            direction,
            amount,
            status: OrderStatus::Open,
            result: Decimal::ZERO,
        }
    }

    /// Applies a resolution draw and returns the balance after crediting it
    /// (stake plus payout on a win, nothing otherwise).
    ///
    /// Terminal orders are left untouched, so this credits at most once. On
    /// overflow the order and the balance both stay as they were.
    pub fn settle(
        &mut self,
        draw: Draw,
        payout_rate: Decimal,
        balance: Decimal,
    ) -> BrokerResult<Decimal> {
        if self.status.is_terminal() {
            return Ok(balance);
        }
        match draw {
            Draw::Win => {
                let result = self
                    .amount
                    .checked_mul(payout_rate)
                    .ok_or_else(|| BrokerError::invalid("payout overflows the order amount"))?;
                let credit = checked_credit(self.amount, result)?;
                let balance = checked_credit(balance, credit)?;
                self.status = OrderStatus::Win;
                self.result = result;
                Ok(balance)
            }
            Draw::Loss => {
                self.status = OrderStatus::Loss;
                self.result = -self.amount;
                Ok(balance)
            }
            Draw::Pending => Ok(balance),
        }
    }

    /// Cancels an open order and returns the balance with its stake refunded.
    pub fn cancel(&mut self, balance: Decimal) -> BrokerResult<Decimal> {
        if self.status != OrderStatus::Open {
            return Err(BrokerError::OrderConflict {
                id: self.id,
                status: self.status,
            });
        }
        let balance = checked_credit(balance, self.amount)?;
        self.status = OrderStatus::Cancelled;
        self.result = Decimal::ZERO;
        Ok(balance)
    }
}
