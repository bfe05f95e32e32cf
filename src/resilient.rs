//! Resilience wrapper providing paced, bounded retries for outbound calls.
//!
//! Both the model-calling path and the market-data path go through
//! [`ResilientCaller`]: every attempt may be preceded by a randomized pacing
//! sleep (to stay under upstream rate limits), failed attempts are retried
//! with a backoff schedule, and [`ResilientCaller::call_or_else`] guarantees
//! the caller gets a usable value back instead of an error.
//!
//! Permanent errors (authentication, invalid requests) are not retried.
//!
//! # Example
//!
//! ```no_run
//! use advisor::resilient::{ResilientCaller, RetryPolicy};
//!
//! # async fn demo() {
//! let caller = ResilientCaller::new(RetryPolicy::for_model_calls());
//! let greeting = caller
//!     .call_or_else(
//!         || async { fetch_greeting().await },
//!         |e| format!("Greeting unavailable: {}", e),
//!     )
//!     .await;
//! # }
//! # async fn fetch_greeting() -> Result<String, advisor::error::AdvisorError> { Ok("hi".into()) }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::error::AdvisorError;

/// A uniform random delay window applied before an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingWindow {
    /// Lower bound of the sleep duration
    pub min: Duration,
    /// Upper bound of the sleep duration
    pub max: Duration,
}

impl PacingWindow {
    /// Creates a pacing window between `min` and `max` (inclusive).
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Draws a duration uniformly from the window.
    ///
    /// The RNG is used and dropped synchronously so callers can await the
    /// resulting sleep without holding a non-`Send` generator.
    pub fn draw(&self) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        if hi <= lo {
            return self.min;
        }
        let ms = rand::thread_rng().gen_range(lo..=hi);
        Duration::from_millis(ms)
    }

    /// Sleeps for a randomly drawn duration within the window.
    pub async fn pause(&self) {
        let delay = self.draw();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

/// Delay schedule applied between a failed attempt and the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffSchedule {
    /// No delay between attempts
    None,
    /// The same delay after every failed attempt
    Fixed(Duration),
    /// `base * (attempt_index + 1)`, growing linearly across attempts
    Linear(Duration),
}

impl BackoffSchedule {
    /// Returns the delay to sleep after the attempt with the given zero-based
    /// index, or `None` when no delay applies.
    ///
    /// Delays are non-decreasing in `attempt_index` for every variant.
    pub fn delay_after(&self, attempt_index: usize) -> Option<Duration> {
        match self {
            BackoffSchedule::None => None,
            BackoffSchedule::Fixed(d) => Some(*d),
            BackoffSchedule::Linear(base) => {
                let factor = attempt_index.saturating_add(1).min(u32::MAX as usize) as u32;
                Some(base.saturating_mul(factor))
            }
        }
    }
}

/// Configuration for pacing, retry and backoff behavior.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first one
    pub max_attempts: usize,
    /// Optional randomized sleep before every attempt
    pub pacing: Option<PacingWindow>,
    /// Delay schedule between failed attempts
    pub backoff: BackoffSchedule,
}

impl RetryPolicy {
    /// Policy used for chat-model calls: three attempts, no pre-call pacing,
    /// a fixed two-second delay between attempts.
    pub fn for_model_calls() -> Self {
        Self {
            max_attempts: 3,
            pacing: None,
            backoff: BackoffSchedule::Fixed(Duration::from_secs(2)),
        }
    }

    /// Policy used for market-data fetches: three attempts, a randomized
    /// 2-4 second pause before each attempt, linear backoff with a
    /// five-second base.
    pub fn for_market_data() -> Self {
        Self {
            max_attempts: 3,
            pacing: Some(PacingWindow::new(
                Duration::from_secs(2),
                Duration::from_secs(4),
            )),
            backoff: BackoffSchedule::Linear(Duration::from_secs(5)),
        }
    }

    /// Policy with the given attempt budget and no sleeps at all.
    /// Useful in tests and for local providers that need no pacing.
    pub fn no_delays(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            pacing: None,
            backoff: BackoffSchedule::None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::for_model_calls()
    }
}

fn is_retryable(err: &AdvisorError) -> bool {
    match err {
        AdvisorError::HttpError(_) => true,
        AdvisorError::ProviderError(_) => true,
        AdvisorError::JsonError(_) => true,
        AdvisorError::EmptyResponse(_) => true,
        AdvisorError::Generic(_) => true,
        AdvisorError::RetryExceeded { .. } => false,
        AdvisorError::AuthError(_) => false,
        AdvisorError::InvalidRequest(_) => false,
    }
}

/// Executes operations under a [`RetryPolicy`].
///
/// One caller instance is cheap and carries no state across calls; agents and
/// the throttled market-data wrapper each own one.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResilientCaller {
    policy: RetryPolicy,
}

impl ResilientCaller {
    /// Creates a caller with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the configured policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `op` until it succeeds or the attempt budget is exhausted.
    ///
    /// Non-retryable errors (auth, invalid request) are returned immediately
    /// without consuming the remaining attempts. When the budget runs out the
    /// terminal error is [`AdvisorError::RetryExceeded`] carrying the last
    /// observed failure.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, AdvisorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AdvisorError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_err: Option<AdvisorError> = None;

        for attempt in 0..max_attempts {
            if let Some(window) = &self.policy.pacing {
                window.pause().await;
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !is_retryable(&e) {
                        return Err(e);
                    }
                    if attempt + 1 < max_attempts {
                        let delay = self.policy.backoff.delay_after(attempt);
                        log::warn!(
                            "attempt {}/{} failed ({}), retrying in {:?}",
                            attempt + 1,
                            max_attempts,
                            e,
                            delay.unwrap_or_default()
                        );
                        last_err = Some(e);
                        if let Some(d) = delay {
                            if !d.is_zero() {
                                sleep(d).await;
                            }
                        }
                    } else {
                        last_err = Some(e);
                    }
                }
            }
        }

        let last_error = last_err.map(|e| e.to_string()).unwrap_or_default();
        log::error!(
            "giving up after {} attempts: {}",
            max_attempts,
            last_error
        );
        Err(AdvisorError::RetryExceeded {
            attempts: max_attempts,
            last_error,
        })
    }

    /// Runs `op` under the retry policy and substitutes `fallback` for any
    /// terminal error. This is the never-throwing surface: the UI layer above
    /// it always receives a usable value.
    pub async fn call_or_else<T, F, Fut>(
        &self,
        op: F,
        fallback: impl FnOnce(&AdvisorError) -> T,
    ) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AdvisorError>>,
    {
        match self.call(op).await {
            Ok(value) => value,
            Err(e) => {
                log::error!("substituting fallback value: {}", e);
                fallback(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_grows_with_attempts() {
        let schedule = BackoffSchedule::Linear(Duration::from_secs(5));
        assert_eq!(schedule.delay_after(0), Some(Duration::from_secs(5)));
        assert_eq!(schedule.delay_after(1), Some(Duration::from_secs(10)));
        assert_eq!(schedule.delay_after(2), Some(Duration::from_secs(15)));
    }

    #[test]
    fn delays_are_non_decreasing() {
        for schedule in [
            BackoffSchedule::None,
            BackoffSchedule::Fixed(Duration::from_secs(2)),
            BackoffSchedule::Linear(Duration::from_secs(5)),
        ] {
            let mut prev = Duration::ZERO;
            for i in 0..8 {
                let d = schedule.delay_after(i).unwrap_or(prev);
                assert!(d >= prev, "{:?} decreased at attempt {}", schedule, i);
                prev = d;
            }
        }
    }

    #[test]
    fn pacing_window_draw_stays_in_bounds() {
        let window = PacingWindow::new(Duration::from_millis(20), Duration::from_millis(40));
        for _ in 0..100 {
            let d = window.draw();
            assert!(d >= window.min && d <= window.max);
        }
    }

    #[test]
    fn degenerate_pacing_window_returns_min() {
        let window = PacingWindow::new(Duration::from_millis(5), Duration::from_millis(5));
        assert_eq!(window.draw(), Duration::from_millis(5));
    }

    #[test]
    fn retryability_classification() {
        assert!(is_retryable(&AdvisorError::ProviderError("x".into())));
        assert!(is_retryable(&AdvisorError::EmptyResponse("x".into())));
        assert!(!is_retryable(&AdvisorError::AuthError("x".into())));
        assert!(!is_retryable(&AdvisorError::InvalidRequest("x".into())));
    }
}
