//! Service configuration types.

use crate::utils::retry::{ConfigError, RetryConfig};
use std::time::Duration;

/// Configuration for the [`SmsService`](super::SmsService).
///
/// `retry` wraps every single driver call (balance, number request, the state
/// poll made while provisioning). SMS polling uses its own schedule starting
/// at `sms_poll_delay`, with the attempt budget chosen per call.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsServiceConfig {
    /// Retry schedule for individual driver calls.
    pub retry: RetryConfig,
    /// Delay before the second SMS poll.
    pub sms_poll_delay: Duration,
    /// Upper bound for the delay between SMS polls.
    pub sms_max_delay: Duration,
}

impl Default for SmsServiceConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl SmsServiceConfig {
    /// Quick feedback: fast driver retries, SMS polls capped at 5s.
    pub fn fast() -> Self {
        Self {
            retry: RetryConfig::fast(),
            sms_poll_delay: Duration::from_millis(500),
            sms_max_delay: Duration::from_secs(5),
        }
    }

    /// The default: 1s first SMS delay, capped at 30s.
    pub fn balanced() -> Self {
        Self {
            retry: RetryConfig::balanced(),
            sms_poll_delay: Duration::from_secs(1),
            sms_max_delay: Duration::from_secs(30),
        }
    }

    /// Slow services: patient driver retries, SMS polls capped at 60s.
    pub fn patient() -> Self {
        Self {
            retry: RetryConfig::patient(),
            sms_poll_delay: Duration::from_secs(3),
            sms_max_delay: Duration::from_secs(60),
        }
    }

    /// Create a new builder for SmsServiceConfig.
    ///
    /// # Example
    ///
    /// ```rust
    /// use onlinesim::{RetryConfig, SmsServiceConfig};
    /// use std::time::Duration;
    ///
    /// let config = SmsServiceConfig::builder()
    ///     .retry(RetryConfig::fast())
    ///     .sms_poll_delay(Duration::from_secs(2))
    ///     .build();
    ///
    /// assert_eq!(config.sms_poll_delay, Duration::from_secs(2));
    /// ```
    pub fn builder() -> SmsServiceConfigBuilder {
        SmsServiceConfigBuilder::default()
    }

    /// Replace the driver retry schedule.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the delay before the second SMS poll.
    pub fn with_sms_poll_delay(mut self, delay: Duration) -> Self {
        self.sms_poll_delay = delay;
        self
    }

    /// Set the cap for the delay between SMS polls.
    pub fn with_sms_max_delay(mut self, delay: Duration) -> Self {
        self.sms_max_delay = delay;
        self
    }

    /// Schedule used by SMS polling with the given attempt budget.
    pub fn sms_retry(&self, max_attempts: u32) -> RetryConfig {
        RetryConfig {
            initial_delay: self.sms_poll_delay,
            max_delay: self.sms_max_delay,
            factor: self.retry.factor,
            max_attempts,
        }
    }

    /// Check both schedules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        self.sms_retry(1).validate()
    }
}

/// Builder for SmsServiceConfig.
#[derive(Debug, Clone, Default)]
pub struct SmsServiceConfigBuilder {
    config: SmsServiceConfig,
}

impl SmsServiceConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the driver retry schedule.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the delay before the second SMS poll.
    ///
    /// Default: 1 second
    pub fn sms_poll_delay(mut self, delay: Duration) -> Self {
        self.config.sms_poll_delay = delay;
        self
    }

    /// Set the cap for the delay between SMS polls.
    ///
    /// Default: 30 seconds
    pub fn sms_max_delay(mut self, delay: Duration) -> Self {
        self.config.sms_max_delay = delay;
        self
    }

    /// Build the SmsServiceConfig.
    pub fn build(self) -> SmsServiceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_default() {
        let config = SmsServiceConfig::default();
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.sms_poll_delay, Duration::from_secs(1));
        assert_eq!(config.sms_max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(SmsServiceConfig::fast().validate().is_ok());
        assert!(SmsServiceConfig::balanced().validate().is_ok());
        assert!(SmsServiceConfig::patient().validate().is_ok());
    }

    #[test]
    fn test_sms_retry_schedule() {
        let config = SmsServiceConfig::default().with_sms_poll_delay(Duration::from_secs(2));
        let retry = config.sms_retry(10);
        assert_eq!(retry.initial_delay, Duration::from_secs(2));
        assert_eq!(retry.max_delay, Duration::from_secs(30));
        assert_eq!(retry.max_attempts, 10);
    }

    #[test]
    fn test_invalid_sms_schedule() {
        let config = SmsServiceConfig::default()
            .with_sms_poll_delay(Duration::from_secs(90))
            .with_sms_max_delay(Duration::from_secs(30));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InitialExceedsMax { .. })
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = SmsServiceConfig::builder()
            .retry(RetryConfig::patient())
            .sms_poll_delay(Duration::from_secs(5))
            .sms_max_delay(Duration::from_secs(45))
            .build();

        assert_eq!(config.retry, RetryConfig::patient());
        assert_eq!(config.sms_poll_delay, Duration::from_secs(5));
        assert_eq!(config.sms_max_delay, Duration::from_secs(45));
    }
}
