//! Main service implementation.

use super::config::SmsServiceConfig;
use super::traits::SmsServiceTrait;
use crate::errors::{Attempt, Error, Result, RetryError};
use crate::provider::Provider;
use crate::response::{OutcomeCode, StateEntry};
use crate::services::Service;
use crate::types::{FullNumber, NumberAllocation, OperationId};
use crate::utils::retry::{OnRetryCallback, Retrier, RetryConfig};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Workflow layer over any [`Provider`].
///
/// Wraps each driver call in the backoff retrier and interprets state polls:
/// - `get_balance`: one retried balance query
/// - `get_number`: a retried number request followed by a retried state poll
/// - `get_sms`: repeated state polls until every held number has an answer
///
/// Jitter comes from one generator seeded from OS entropy when the service is
/// created; each call derives its own generator from it.
///
/// # Example
///
/// ```rust,ignore
/// use onlinesim::{OnlinesimClient, Service, SmsService, SmsServiceTrait};
///
/// let client = OnlinesimClient::from_env()?;
/// let service = SmsService::with_provider(client);
///
/// let allocation = service.get_number(Service::Telegram).await?;
/// println!("Got number: {}", allocation.numbers[0]);
///
/// let texts = service.get_sms(allocation.operation_id, 10).await?;
/// println!("Got messages: {:?}", texts);
/// ```
pub struct SmsService<P: Provider> {
    provider: P,
    config: SmsServiceConfig,
    rng: Arc<Mutex<StdRng>>,
    cancel: CancellationToken,
    on_retry: Option<OnRetryCallback<Error>>,
}

impl<P: Provider + Clone> Clone for SmsService<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            config: self.config.clone(),
            rng: Arc::clone(&self.rng),
            cancel: self.cancel.clone(),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<P: Provider + Debug> Debug for SmsService<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsService")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "..."))
            .finish()
    }
}

impl<P: Provider> SmsService<P> {
    /// Create a new service with a custom provider and configuration.
    pub fn new(provider: P, config: SmsServiceConfig) -> Self {
        Self {
            provider,
            config,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            cancel: CancellationToken::new(),
            on_retry: None,
        }
    }

    /// Create a new service with default configuration.
    pub fn with_provider(provider: P) -> Self {
        Self::new(provider, SmsServiceConfig::default())
    }

    /// Create a new builder for SmsService.
    pub fn builder(provider: P) -> SmsServiceBuilder<P> {
        SmsServiceBuilder::new(provider)
    }

    /// Replace the jitter source.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Arc::new(Mutex::new(rng));
        self
    }

    /// Abort every operation of this service once `token` is cancelled.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set a callback to be invoked before each retry.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let service = SmsService::with_provider(client)
    ///     .with_on_retry(|error, duration| {
    ///         println!("Retrying after {:?} due to: {}", duration, error);
    ///     });
    /// ```
    pub fn with_on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Error, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Get reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get reference to the service configuration.
    pub fn config(&self) -> &SmsServiceConfig {
        &self.config
    }

    /// Token that cancels every operation of this service.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Like [`get_sms`](SmsServiceTrait::get_sms), but also stops when `token`
    /// is cancelled.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "onlinesim.get_sms",
            skip_all,
            fields(tzid = %tzid, max_attempts)
        )
    )]
    pub async fn get_sms_cancellable(
        &self,
        tzid: OperationId,
        max_attempts: u32,
        token: CancellationToken,
    ) -> Result<Vec<String>> {
        #[cfg(feature = "tracing")]
        debug!("Starting SMS polling");

        let texts = self
            .retrier(self.config.sms_retry(max_attempts), token)
            .run(|| async move {
                let entries = self.provider.poll_state(tzid).await?;
                collect_texts(tzid, &entries)
            })
            .await?;

        #[cfg(feature = "tracing")]
        info!(messages = texts.len(), "SMS received");

        Ok(texts)
    }

    /// Fresh retrier with its own attempt state and jitter generator.
    fn retrier(&self, config: RetryConfig, token: CancellationToken) -> Retrier<Error> {
        let seed = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_u64();

        Retrier::new(config, StdRng::seed_from_u64(seed))
            .with_cancellation(token)
            .with_on_retry(self.on_retry.clone())
    }
}

impl<P: Provider> SmsServiceTrait for SmsService<P> {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "onlinesim.get_balance", skip_all)
    )]
    async fn get_balance(&self) -> Result<f64> {
        let balance = self
            .retrier(self.config.retry.clone(), self.cancel.clone())
            .run(|| self.provider.fetch_balance())
            .await?;

        #[cfg(feature = "tracing")]
        debug!(balance, "Balance fetched");

        Ok(balance)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "onlinesim.get_number",
            skip_all,
            fields(service = %service.code())
        )
    )]
    async fn get_number(&self, service: Service) -> Result<NumberAllocation> {
        let tzid = self
            .retrier(self.config.retry.clone(), self.cancel.clone())
            .run(|| self.provider.request_number(&service))
            .await?;

        let entries = self
            .retrier(self.config.retry.clone(), self.cancel.clone())
            .run(|| self.provider.poll_state(tzid))
            .await?;

        let numbers: Vec<FullNumber> = entries
            .into_iter()
            .filter(|entry| !entry.number.is_empty())
            .map(|entry| FullNumber::from(entry.number))
            .collect();

        #[cfg(feature = "tracing")]
        info!(tzid = %tzid, numbers = numbers.len(), "Number allocated");

        Ok(NumberAllocation {
            numbers,
            operation_id: tzid,
        })
    }

    async fn get_sms(&self, tzid: OperationId, max_attempts: u32) -> Result<Vec<String>> {
        self.get_sms_cancellable(tzid, max_attempts, self.cancel.clone())
            .await
    }
}

/// Interpret one poll: all entries must be answered before any text is returned.
///
/// Entries are checked in order and the first non-answered one decides the
/// attempt: a pending entry retries the whole poll, anything else is fatal.
fn collect_texts(tzid: OperationId, entries: &[StateEntry]) -> Attempt<Vec<String>> {
    let mut texts = Vec::new();
    for entry in entries {
        match entry.response {
            OutcomeCode::AnswerReceived => texts.extend(entry.texts().map(str::to_owned)),
            code if code.is_pending() => {
                return Err(RetryError::Transient(Error::Pending { tzid, code }));
            }
            code => return Err(RetryError::Fatal(Error::UnexpectedState { tzid, code })),
        }
    }
    Ok(texts)
}

/// Builder for SmsService.
///
/// # Example
///
/// ```rust,ignore
/// use onlinesim::{SmsService, SmsServiceConfig};
///
/// let service = SmsService::builder(client)
///     .config(SmsServiceConfig::patient())
///     .build();
/// ```
pub struct SmsServiceBuilder<P: Provider> {
    provider: P,
    config: SmsServiceConfig,
    rng: Option<StdRng>,
    cancel: Option<CancellationToken>,
}

impl<P: Provider> SmsServiceBuilder<P> {
    /// Create a new builder with the given provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: SmsServiceConfig::default(),
            rng: None,
            cancel: None,
        }
    }

    /// Set the full configuration.
    pub fn config(mut self, config: SmsServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the driver retry schedule.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Use `rng` as the jitter source.
    pub fn rng(mut self, rng: StdRng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Set the service-wide cancellation token.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate the configuration and build the SmsService.
    pub fn build(self) -> Result<SmsService<P>> {
        self.config.validate()?;

        let mut service = SmsService::new(self.provider, self.config);
        if let Some(rng) = self.rng {
            service = service.with_rng(rng);
        }
        if let Some(token) = self.cancel {
            service = service.with_cancellation_token(token);
        }
        Ok(service)
    }
}
