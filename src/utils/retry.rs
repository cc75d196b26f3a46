//! Bounded retry with exponential backoff and jitter.

use crate::errors::{RetryAbort, RetryError};
use rand::Rng;
use rand::rngs::StdRng;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Inconsistent retry settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A factor below one would shrink the delay between attempts.
    #[error("backoff factor must be a finite value >= 1.0, got {factor}")]
    InvalidFactor { factor: f64 },
    /// The delay cap must leave room for at least some waiting.
    #[error("max delay must be greater than zero")]
    ZeroMaxDelay,
    /// The first delay already exceeds the cap.
    #[error("initial delay {initial:?} exceeds max delay {max:?}")]
    InitialExceedsMax { initial: Duration, max: Duration },
}

/// Configuration for retry behavior.
///
/// `max_attempts` counts every invocation including the first one, so a value
/// of `1` disables retrying and `0` never runs the operation.
///
/// ```rust
/// use onlinesim::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_initial_delay(Duration::from_millis(500))
///     .with_max_delay(Duration::from_secs(60))
///     .with_factor(1.5)
///     .with_max_attempts(5);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry (default: 1 second).
    pub initial_delay: Duration,
    /// Upper bound for any single sleep (default: 30 seconds).
    pub max_delay: Duration,
    /// Growth factor applied to the delay after every retry (default: 2.0).
    pub factor: f64,
    /// Total number of attempts, the first one included (default: 3).
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl RetryConfig {
    /// Short delays for interactive use: 3 attempts, 250ms initial, 5s cap.
    pub fn fast() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
            max_attempts: 3,
        }
    }

    /// The default: 3 attempts, 1s initial, 30s cap.
    pub fn balanced() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            max_attempts: 3,
        }
    }

    /// For flaky links: 8 attempts, 2s initial, 60s cap.
    pub fn patient() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            factor: 2.0,
            max_attempts: 8,
        }
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the cap for a single sleep.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the exponential backoff factor.
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Set the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Check that the settings describe a non-shrinking, capped schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ConfigError::InvalidFactor {
                factor: self.factor,
            });
        }
        if self.max_delay.is_zero() {
            return Err(ConfigError::ZeroMaxDelay);
        }
        if self.initial_delay > self.max_delay {
            return Err(ConfigError::InitialExceedsMax {
                initial: self.initial_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}

/// Per-invocation retry state: attempts left and the current base delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    remaining: u32,
    delay: Duration,
    max_delay: Duration,
    factor: f64,
}

impl Backoff {
    /// Start a fresh schedule from the given configuration.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            remaining: config.max_attempts,
            delay: config.initial_delay.min(config.max_delay),
            max_delay: config.max_delay,
            factor: config.factor.max(1.0),
        }
    }

    /// Attempts that may still be made.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Base delay the next sleep is computed from.
    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    /// Record that one attempt is being made.
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Compute the sleep before the next attempt and grow the base delay.
    ///
    /// The sleep lies in `[delay, delay + delay / 2)`, clamped to the cap.
    pub fn next_sleep<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let sleep = (self.delay + jitter(self.delay, rng)).min(self.max_delay);

        let grown = Duration::try_from_secs_f64(self.delay.as_secs_f64() * self.factor)
            .unwrap_or(self.max_delay);
        self.delay = grown.max(self.delay).min(self.max_delay);

        sleep
    }
}

/// Uniform value in `[0, delay / 2)`.
fn jitter<R: Rng + ?Sized>(delay: Duration, rng: &mut R) -> Duration {
    let half = u64::try_from((delay / 2).as_nanos()).unwrap_or(u64::MAX);
    if half == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rng.gen_range(0..half))
}

/// Callback invoked before each retry with the failure and the upcoming sleep.
pub type OnRetryCallback<E> = Arc<dyn Fn(&E, Duration) + Send + Sync>;

/// Runs a fallible operation until it succeeds, fails fatally, or runs out of
/// attempts.
///
/// The retrier knows nothing about the operation beyond the [`RetryError`]
/// tag it returns. Sleeps between attempts race against a
/// [`CancellationToken`].
///
/// # Example
///
/// ```rust,ignore
/// use onlinesim::{Retrier, RetryConfig, RetryError};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut retrier = Retrier::new(RetryConfig::fast(), StdRng::seed_from_u64(7));
/// let value = retrier
///     .run(|| async { Ok::<_, RetryError<onlinesim::Error>>(42) })
///     .await?;
/// ```
pub struct Retrier<E, R = StdRng> {
    config: RetryConfig,
    rng: R,
    cancel: CancellationToken,
    on_retry: Option<OnRetryCallback<E>>,
}

impl<E, R: Rng> Retrier<E, R> {
    /// Create a retrier drawing jitter from `rng`.
    pub fn new(config: RetryConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            cancel: CancellationToken::new(),
            on_retry: None,
        }
    }

    /// Abort between attempts once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set a callback to be invoked on each retry.
    pub fn with_on_retry(mut self, callback: Option<OnRetryCallback<E>>) -> Self {
        self.on_retry = callback;
        self
    }

    /// Get reference to the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` under the configured budget.
    ///
    /// A fatal error is returned as-is after a single invocation. When the
    /// budget runs out, the last transient error is returned.
    pub async fn run<T, F, Fut>(&mut self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RetryError<E>>>,
        E: From<RetryAbort> + Display,
    {
        let mut backoff = Backoff::new(&self.config);
        if backoff.remaining() == 0 {
            return Err(RetryAbort::NoAttempts.into());
        }

        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(RetryAbort::Cancelled.into());
            }

            backoff.consume();
            attempt += 1;

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(RetryError::Fatal(err)) => {
                    #[cfg(feature = "tracing")]
                    warn!(error = %err, attempt, "Fatal error, not retrying");
                    return Err(err);
                }
                Err(RetryError::Transient(err)) => err,
            };

            if backoff.remaining() == 0 {
                #[cfg(feature = "tracing")]
                warn!(error = %err, attempts = attempt, "Retry budget exhausted");
                return Err(err);
            }

            let wait = backoff.next_sleep(&mut self.rng);

            if let Some(ref callback) = self.on_retry {
                callback(&err, wait);
            }

            #[cfg(feature = "tracing")]
            debug!(
                error = %err,
                attempt,
                retry_after_secs = %wait.as_secs_f64(),
                "Retrying after transient error"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(RetryAbort::Cancelled.into()),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq, Error)]
    enum TestError {
        #[error("aborted: {0}")]
        Abort(#[from] RetryAbort),
        #[error("attempt {0} failed")]
        Failed(u32),
    }

    fn retrier(max_attempts: u32) -> Retrier<TestError> {
        let config = RetryConfig::default()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
            .with_max_attempts(max_attempts);
        Retrier::new(config, StdRng::seed_from_u64(42))
    }

    #[test]
    fn test_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.factor, 2.0);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config, RetryConfig::balanced());
    }

    #[test]
    fn test_config_validation() {
        assert!(RetryConfig::fast().validate().is_ok());
        assert!(RetryConfig::patient().validate().is_ok());

        assert_eq!(
            RetryConfig::default().with_factor(0.5).validate(),
            Err(ConfigError::InvalidFactor { factor: 0.5 })
        );
        assert!(matches!(
            RetryConfig::default().with_factor(f64::NAN).validate(),
            Err(ConfigError::InvalidFactor { .. })
        ));
        assert_eq!(
            RetryConfig::default()
                .with_max_delay(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroMaxDelay)
        );
        assert!(matches!(
            RetryConfig::default()
                .with_initial_delay(Duration::from_secs(60))
                .validate(),
            Err(ConfigError::InitialExceedsMax { .. })
        ));
    }

    #[test]
    fn test_backoff_sleep_bounds() {
        let config = RetryConfig::default()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(5))
            .with_max_attempts(20);
        let mut backoff = Backoff::new(&config);
        let mut rng = StdRng::seed_from_u64(1);

        let mut previous = Duration::ZERO;
        for _ in 0..20 {
            let delay = backoff.current_delay();
            assert!(delay >= previous, "base delay must not shrink");

            let sleep = backoff.next_sleep(&mut rng);
            assert!(sleep >= delay);
            assert!(sleep <= config.max_delay);
            assert!(sleep < delay + delay / 2 || delay == config.max_delay);

            previous = delay;
        }
        assert_eq!(backoff.current_delay(), config.max_delay);
    }

    #[test]
    fn test_backoff_doubles_delay() {
        let config = RetryConfig::default()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(30));
        let mut backoff = Backoff::new(&config);
        let mut rng = StdRng::seed_from_u64(9);

        backoff.next_sleep(&mut rng);
        assert_eq!(backoff.current_delay(), Duration::from_secs(2));
        backoff.next_sleep(&mut rng);
        assert_eq!(backoff.current_delay(), Duration::from_secs(4));
    }

    #[test]
    fn test_zero_delay_has_no_jitter() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(jitter(Duration::ZERO, &mut rng), Duration::ZERO);
        assert_eq!(jitter(Duration::from_nanos(1), &mut rng), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_never_invokes() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retrier(0)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(TestError::Abort(RetryAbort::NoAttempts)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_does_not_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retrier(1)
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(RetryError::Transient(TestError::Failed(n)))
            })
            .await;

        assert_eq!(result, Err(TestError::Failed(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retrier(5)
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(RetryError::Fatal(TestError::Failed(n)))
            })
            .await;

        assert_eq!(result, Err(TestError::Failed(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let result: Result<(), TestError> = retrier(4)
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(RetryError::Transient(TestError::Failed(n)))
            })
            .await;

        assert_eq!(result, Err(TestError::Failed(4)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 100ms + 200ms + 400ms at minimum
        assert!(start.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retrier(5)
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(RetryError::Transient(TestError::Failed(n)))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_retry_callback() {
        let notified = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&notified);
        let callback: OnRetryCallback<TestError> = Arc::new(move |_err, wait| {
            assert!(wait >= Duration::from_millis(100));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result: Result<(), TestError> = retrier(3)
            .with_on_retry(Some(callback))
            .run(|| async { Err(RetryError::Transient(TestError::Failed(0))) })
            .await;

        assert!(result.is_err());
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_sleep() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let calls = AtomicU32::new(0);

        let result: Result<(), TestError> = retrier(10)
            .with_cancellation(token)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                trigger.cancel();
                async { Err(RetryError::Transient(TestError::Failed(1))) }
            })
            .await;

        assert_eq!(result, Err(TestError::Abort(RetryAbort::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);

        let result: Result<(), TestError> = retrier(3)
            .with_cancellation(token)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(TestError::Abort(RetryAbort::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
