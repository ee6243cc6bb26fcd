// src/config.rs

use crate::error::{BrokerError, BrokerResult};
use crate::types::AccountType;
use config::{Config, ConfigError, File};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const DEFAULT_SYMBOLS: [&str; 3] = ["EURUSD", "USDJPY", "GBPUSD"];

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub account_type: AccountType,
    /// Starting balance of a demo account. Real accounts always start at zero.
    pub demo_balance: Decimal,
    pub symbols: Vec<String>,
    pub fail_chance: f64,
    /// Total attempts per operation, including the first.
    pub max_retries: u32,
    pub payout_rate: Decimal,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            account_type: AccountType::Demo,
            demo_balance: Decimal::from(1000),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            fail_chance: 0.0,
            max_retries: 3,
            payout_rate: Decimal::new(80, 2),
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> BrokerResult<()> {
        if !self.fail_chance.is_finite() || !(0.0..=1.0).contains(&self.fail_chance) {
            return Err(BrokerError::invalid("fail_chance must be within [0, 1]"));
        }
        if self.max_retries == 0 {
            return Err(BrokerError::invalid("max_retries must be at least 1"));
        }
        if self.symbols.is_empty() {
            return Err(BrokerError::invalid("symbol list must not be empty"));
        }
        if self.payout_rate <= Decimal::ZERO || self.payout_rate > Decimal::ONE {
            return Err(BrokerError::invalid("payout_rate must be within (0, 1]"));
        }
        if self.demo_balance.is_sign_negative() {
            return Err(BrokerError::invalid("demo_balance must not be negative"));
        }
        Ok(())
    }

    pub fn starting_balance(&self) -> Decimal {
        match self.account_type {
            AccountType::Demo => self.demo_balance,
            AccountType::Real => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DemoConfig {
    pub stake: Decimal,
    pub rounds: u32,
    pub poll_interval_ms: u64,
    /// Status checks before an order still open gets cancelled.
    pub max_polls: u32,
    pub tui: bool,
    pub log_dir: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            stake: Decimal::from(10),
            rounds: 5,
            poll_interval_ms: 250,
            max_polls: 4,
            tui: false,
            log_dir: "logs".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let session = SessionConfig::default();
        let demo = DemoConfig::default();

        let builder = Config::builder()
            .set_default("session.account_type", "demo")?
            .set_default("session.demo_balance", session.demo_balance.to_string())?
            .set_default("session.symbols", DEFAULT_SYMBOLS.to_vec())?
            .set_default("session.fail_chance", session.fail_chance)?
            .set_default("session.max_retries", session.max_retries)?
            .set_default("session.payout_rate", session.payout_rate.to_string())?
            .set_default("demo.stake", demo.stake.to_string())?
            .set_default("demo.rounds", demo.rounds)?
            .set_default("demo.poll_interval_ms", demo.poll_interval_ms)?
            .set_default("demo.max_polls", demo.max_polls)?
            .set_default("demo.tui", demo.tui)?
            .set_default("demo.log_dir", demo.log_dir)?
            .add_source(File::with_name("Settings").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("session.symbols")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let app: AppConfig = config.try_deserialize()?;
        app.session
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(app)
    }
}
