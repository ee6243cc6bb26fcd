// src/error.rs
use crate::types::{OrderId, OrderStatus};
use thiserror::Error;

/// Errors surfaced by the simulated broker.
///
/// Only [`BrokerError::ApiUnavailable`] is transient; every other variant is a
/// domain error and reaches the caller on its first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown order {0}")]
    OrderNotFound(OrderId),

    #[error("Order {id} cannot be modified (status: {status})")]
    OrderConflict { id: OrderId, status: OrderStatus },

    #[error("API unavailable after {attempts} attempt(s)")]
    ApiUnavailable { attempts: u32 },
}

impl BrokerError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        BrokerError::InvalidArgument(reason.into())
    }

    /// True only for the simulated-unavailable condition.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::ApiUnavailable { .. })
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
