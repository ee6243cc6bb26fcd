//! Local simulation of a binary-options broker API.
//!
//! [`AccountSession`] holds the balance and the order table and routes every
//! operation through a [`RetryingCaller`] that injects simulated outages.
//! Market data is generated locally; nothing touches the network.

pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod logging;
pub mod market;
pub mod output;
pub mod tui;
pub mod types;
pub mod utils;

pub use crate::core::order::{Draw, Order};
pub use crate::core::retry::RetryingCaller;
pub use crate::core::session::AccountSession;
pub use crate::error::{BrokerError, BrokerResult};
pub use crate::types::{AccountType, Candle, MarketDepth, OrderId, OrderStatus, Quote, Side};
