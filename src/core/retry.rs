// src/core/retry.rs
use crate::error::{BrokerError, BrokerResult};
use crate::logging::EventLog;
use rand::{Rng, RngCore};

/// Failure injection plus bounded retry, applied uniformly to every session
/// operation.
///
/// `max_retries` counts total attempts: `1` means a single try with no retry.
/// The unavailable draw always happens before the operation body runs, so a
/// rejected attempt never touches account state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryingCaller {
    fail_chance: f64,
    max_retries: u32,
}

impl RetryingCaller {
    pub fn new(fail_chance: f64, max_retries: u32) -> BrokerResult<Self> {
        if !fail_chance.is_finite() || !(0.0..=1.0).contains(&fail_chance) {
            return Err(BrokerError::invalid(format!(
                "fail_chance must be within [0, 1], got {}",
                fail_chance
            )));
        }
        if max_retries == 0 {
            return Err(BrokerError::invalid("max_retries must be at least 1"));
        }
        Ok(Self {
            fail_chance,
            max_retries,
        })
    }

    /// Runs `op` once an attempt passes the unavailable draw.
    ///
    /// Errors returned by `op` are passed through untouched and never retried.
    pub fn call<R, T, F>(&self, rng: &mut R, log: &dyn EventLog, op: F) -> BrokerResult<T>
    where
        R: RngCore + ?Sized,
        F: FnOnce(&mut R) -> BrokerResult<T>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            if rng.gen::<f64>() < self.fail_chance {
                log.error("API unavailable");
                if attempts >= self.max_retries {
                    return Err(BrokerError::ApiUnavailable { attempts });
                }
                log.info("Retrying after API error");
                continue;
            }
            return op(rng);
        }
    }
}
