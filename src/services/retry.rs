//! Bounded retry with escalating slippage allowance.
//!
//! Each attempt widens the allowed slippage by a fixed step up to a cap.
//! The backtester never retries; this is for live execution paths that
//! reuse the same slippage units.

use thiserror::Error;
use tracing::{debug, warn};

/// Retry policy errors.
#[derive(Debug, Error, PartialEq)]
pub enum RetryError<E> {
    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    #[error("Retry policy allows no attempts")]
    NoAttempts,
}

/// Retry policy for fills that may miss at a given slippage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_slippage_bps: f64,
    /// Added per attempt after the first
    pub escalation_bps: f64,
    pub max_slippage_bps: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_slippage_bps: 5.0,
            escalation_bps: 5.0,
            max_slippage_bps: 25.0,
        }
    }
}

impl RetryPolicy {
    /// Slippage allowed on a 1-based attempt.
    pub fn slippage_for_attempt(&self, attempt: u32) -> f64 {
        let steps = attempt.saturating_sub(1) as f64;
        (self.base_slippage_bps + steps * self.escalation_bps).min(self.max_slippage_bps)
    }

    /// Call `op(attempt, slippage_bps)` until it succeeds or attempts run out.
    pub fn execute<T, E, F>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32, f64) -> Result<T, E>,
    {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            let slippage_bps = self.slippage_for_attempt(attempt);
            match op(attempt, slippage_bps) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(
                        "Attempt {} at {:.1} bps failed: {}",
                        attempt, slippage_bps, e
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last_error) => {
                warn!("Giving up after {} attempts: {}", self.max_attempts, last_error);
                Err(RetryError::Exhausted {
                    attempts: self.max_attempts,
                    last_error,
                })
            }
            None => Err(RetryError::NoAttempts),
        }
    }
}
