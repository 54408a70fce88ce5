//! Bounded retry for transient bus failures
//!
//! NACKs and transfer timeouts are transient on a noisy bus and clear on their own
//! once the peripheral finishes whatever kept it busy. [`RetryPolicy`] re-runs a
//! whole transaction a bounded number of times, waiting a little longer after each
//! failure, and turns the final failure into [`Error::RetriesExhausted`].

use crate::Error;

/// Retry budget for a single bus operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Total attempts including the first one (0 is treated as 1)
    pub max_attempts: u32,
    /// Wait after the first failure in milliseconds
    pub initial_backoff_ms: u32,
    /// Upper bound for the doubling backoff in milliseconds
    pub max_backoff_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 1,
            max_backoff_ms: 16,
        }
    }
}

impl RetryPolicy {
    /// Run `operation` once, without retrying
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Retry up to `max_attempts` times with the default backoff
    pub const fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 16,
        }
    }

    /// Backoff to wait after failed attempt number `attempt` (1-based)
    #[must_use]
    pub fn backoff_ms(&self, attempt: u32) -> u32 {
        let shift = attempt.saturating_sub(1).min(32);
        let doubled = u64::from(self.initial_backoff_ms) << shift;
        u32::try_from(doubled)
            .unwrap_or(u32::MAX)
            .min(self.max_backoff_ms)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    ///
    /// # Errors
    ///
    /// Returns [`Error::RetriesExhausted`] carrying the last failure once every
    /// attempt has failed.
    pub fn run<T, E, D, F>(&self, delay: &mut D, mut operation: F) -> Result<T, Error<E>>
    where
        D: embedded_hal::delay::DelayNs,
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(last) if attempt >= attempts => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("retry: giving up after {} attempts", attempt);

                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        last,
                    });
                }
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("retry: attempt {} failed", attempt);

                    delay.delay_ms(self.backoff_ms(attempt));
                    attempt += 1;
                }
            }
        }
    }
}
