use std::{fmt::Display, future::Future, time::Duration};

use backoff::{Clock, exponential::ExponentialBackoff, future::retry_notify};
use tokio::time::Instant;
use tracing::warn;

pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;

/// Stands in for "no cap" on the delay between two attempts.
const UNCAPPED_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Reads time from tokio so a paused runtime also pauses the retry budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> std::time::Instant {
        Instant::now().into_std()
    }
}

/// Exponential backoff parameters.
///
/// Each retry waits `current * (1 ± randomization_factor)`, then `current` grows by `multiplier`.
/// Growth is unbounded unless `max_interval` is set, the total time spent on one logical call is
/// bounded by the budget handed to [retry_with_backoff] instead.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub randomization_factor: f64,
    pub max_interval: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            max_interval: None,
        }
    }
}

impl BackoffPolicy {
    /// Same policy with deterministic delays.
    pub fn without_jitter(self) -> Self {
        Self {
            randomization_factor: 0.0,
            ..self
        }
    }

    /// Backoff that gives up once `budget` has elapsed since it was created.
    pub fn exponential_backoff(&self, budget: Duration) -> ExponentialBackoff<TokioClock> {
        let clock = TokioClock;
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            randomization_factor: self.randomization_factor,
            multiplier: self.multiplier,
            max_interval: self.max_interval.unwrap_or(UNCAPPED_INTERVAL),
            start_time: clock.now(),
            max_elapsed_time: Some(budget),
            clock,
        }
    }
}

#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub elapsed: Duration,
    pub last_error: E,
}

/// Runs `operation` until it succeeds, fails permanently, or `budget` is spent.
///
/// The first attempt always runs. Transient failures are reported as
/// [backoff::Error::transient], failures that retrying can not fix as
/// [backoff::Error::permanent].
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &BackoffPolicy,
    budget: Duration,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, backoff::Error<E>>>,
{
    let start = Instant::now();
    let mut attempts = 0;

    let result = retry_notify(
        policy.exponential_backoff(budget),
        || {
            attempts += 1;
            operation()
        },
        |err: E, delay: Duration| warn!("Attempt failed, retrying in {delay:?}: {err}"),
    )
    .await;

    result.map_err(|last_error| RetryExhausted {
        attempts,
        elapsed: start.elapsed(),
        last_error,
    })
}
