//! OnlineSIM HTTP client and operation drivers.

use crate::errors::{Attempt, Error, Result, RetryError};
use crate::provider::Provider;
use crate::response::{BalanceResponse, NumberResponse, OutcomeCode, StateEntry, StateReply};
use crate::services::Service;
use crate::types::{DialCode, OperationId};
use crate::utils::dial_code::country_to_dial_code;
use keshvar::Country;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::{Span, trace, warn};
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default OnlineSIM API base URL.
pub const DEFAULT_API_URL: &str = "https://onlinesim.ru/api/";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ONLINESIM_API_KEY";

const ACTION_BALANCE: &str = "getBalance";
const ACTION_NUMBER: &str = "getNum";
const ACTION_STATE: &str = "getState";

/// OnlineSIM HTTP client.
///
/// Every driver method performs one GET request and classifies the answer;
/// none of them retries on its own.
///
/// # Example
///
/// ```rust,ignore
/// use onlinesim::{OnlinesimClient, Provider, Service};
///
/// let client = OnlinesimClient::with_api_key("your_api_key")?;
/// let tzid = client.get_number(&Service::Telegram).await?;
/// ```
#[derive(Clone)]
pub struct OnlinesimClient {
    http_client: ClientWithMiddleware,
    api_key: SecretString,
    endpoint: Url,
    country: DialCode,
    message_to_code: bool,
}

impl std::fmt::Debug for OnlinesimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnlinesimClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("country", &self.country)
            .field("message_to_code", &self.message_to_code)
            .finish()
    }
}

/// Builder for configuring an [`OnlinesimClient`].
pub struct OnlinesimClientBuilder {
    api_key: String,
    endpoint: Option<Url>,
    http_client: Option<ClientWithMiddleware>,
    country: DialCode,
    message_to_code: bool,
}

impl OnlinesimClientBuilder {
    /// Create a new builder with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: None,
            http_client: None,
            country: DialCode::default(),
            message_to_code: true,
        }
    }

    /// Set a custom API endpoint.
    pub fn endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set a custom HTTP client with middleware.
    pub fn http_client(mut self, client: ClientWithMiddleware) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Dial code of the country numbers are requested from (default: 7).
    pub fn country(mut self, country: DialCode) -> Self {
        self.country = country;
        self
    }

    /// Request numbers from `country`.
    pub fn country_of(self, country: &Country) -> Self {
        self.country(country_to_dial_code(country))
    }

    /// Ask the service to reduce messages to the verification code (default: true).
    pub fn message_to_code(mut self, enabled: bool) -> Self {
        self.message_to_code = enabled;
        self
    }

    /// Build the [`OnlinesimClient`].
    pub fn build(self) -> Result<OnlinesimClient> {
        let mut endpoint = match self.endpoint {
            Some(url) => url,
            None => Url::parse(DEFAULT_API_URL).map_err(Error::InvalidEndpoint)?,
        };
        // Url::join replaces the last segment unless the base ends with '/'.
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let client = reqwest::Client::builder()
                    .build()
                    .map_err(Error::BuildHttpClient)?;
                ClientBuilder::new(client).build()
            }
        };

        Ok(OnlinesimClient {
            http_client,
            api_key: SecretString::from(self.api_key),
            endpoint,
            country: self.country,
            message_to_code: self.message_to_code,
        })
    }
}

impl OnlinesimClient {
    /// Create a new client against a custom endpoint.
    ///
    /// # Arguments
    /// * `endpoint` - Base URL the action paths are appended to
    /// * `api_key` - API key for authentication
    pub fn new(endpoint: impl AsRef<str>, api_key: impl Into<String>) -> Result<Self> {
        let url = Url::parse(endpoint.as_ref()).map_err(Error::InvalidEndpoint)?;
        Self::builder(api_key).endpoint(url).build()
    }

    /// Create a new client with the default API URL.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    /// Create a client with the key from `ONLINESIM_API_KEY`.
    ///
    /// The variable is read once, here. Every request made by the returned
    /// client carries that key, so later changes to the environment need a
    /// new client.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| Error::MissingApiKey { var: API_KEY_ENV })?;
        Self::with_api_key(api_key)
    }

    /// Create a builder for configuring the client.
    pub fn builder(api_key: impl Into<String>) -> OnlinesimClientBuilder {
        OnlinesimClientBuilder::new(api_key)
    }

    /// Base URL requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Dial code sent with number requests.
    pub fn country(&self) -> &DialCode {
        &self.country
    }

    /// Build request URL with action and parameters.
    fn build_request_url(&self, action: &str, additional: Vec<(&str, String)>) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(&format!("{action}.php"))
            .map_err(Error::InvalidEndpoint)?;

        let mut params = vec![("apikey", self.api_key.expose_secret().to_string())];
        params.extend(additional);

        url.set_query(Some(
            &serde_urlencoded::to_string(&params).map_err(Error::BuildRequestUrl)?,
        ));

        Ok(url)
    }

    /// Send a GET request and return the response text.
    ///
    /// Network failures, 429 and 5xx answers are transient; other non-success
    /// statuses are fatal.
    async fn send_request(&self, action: &'static str, url: Url) -> Attempt<String> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| RetryError::Transient(Error::HttpRequest(e)))?;

        let status = response.status();
        if !status.is_success() {
            let err = Error::HttpStatus {
                action,
                status: status.as_u16(),
            };
            return Err(
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    RetryError::Transient(err)
                } else {
                    RetryError::Fatal(err)
                },
            );
        }

        let text = response
            .text()
            .await
            .map_err(|e| RetryError::Transient(Error::ReadBody(e)))?;

        #[cfg(feature = "tracing")]
        trace!(action, body = %text, "Received response");

        Ok(text)
    }

    /// Get the account balance.
    ///
    /// A malformed body or balance text is fatal, as is a generic failure.
    /// Other non-success classifications are transient.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "OnlinesimClient::get_balance", skip_all)
    )]
    pub async fn get_balance(&self) -> Attempt<f64> {
        let url = self
            .build_request_url(ACTION_BALANCE, Vec::new())
            .map_err(RetryError::Fatal)?;
        let text = self.send_request(ACTION_BALANCE, url).await?;

        let response: BalanceResponse =
            decode(ACTION_BALANCE, &text).map_err(RetryError::Fatal)?;
        check_outcome(ACTION_BALANCE, response.response)?;

        let balance = response
            .balance
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                RetryError::Fatal(Error::InvalidBalance {
                    raw: response.balance.clone(),
                })
            })?;

        #[cfg(feature = "tracing")]
        Span::current().set_status(Status::Ok);

        Ok(balance)
    }

    /// Request a number for `service` in the configured country.
    ///
    /// Only pending classifications are transient. A malformed body, a missing
    /// operation id and every other non-success code end the call.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "OnlinesimClient::get_number",
            skip_all,
            fields(service = %service.code(), country = %self.country, tzid = tracing::field::Empty)
        )
    )]
    pub async fn get_number(&self, service: &Service) -> Attempt<OperationId> {
        let url = self
            .build_request_url(
                ACTION_NUMBER,
                vec![
                    ("service", service.code().to_string()),
                    ("country", self.country.to_string()),
                ],
            )
            .map_err(RetryError::Fatal)?;
        let text = self.send_request(ACTION_NUMBER, url).await?;

        let response: NumberResponse = decode(ACTION_NUMBER, &text).map_err(RetryError::Fatal)?;
        check_terminal_outcome(ACTION_NUMBER, response.response)?;

        let tzid = response
            .tzid
            .ok_or(RetryError::Fatal(Error::MissingOperationId))?;

        #[cfg(feature = "tracing")]
        {
            Span::current()
                .record("tzid", tzid.get())
                .set_status(Status::Ok);
        }

        Ok(tzid)
    }

    /// Poll the state of operation `tzid`.
    ///
    /// Decoding failures are transient here. The poll fails fatally when the
    /// first entry is a generic failure or when no entry is returned.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "OnlinesimClient::get_state",
            skip_all,
            fields(tzid = %tzid)
        )
    )]
    pub async fn get_state(&self, tzid: OperationId) -> Attempt<Vec<StateEntry>> {
        let url = self
            .build_request_url(
                ACTION_STATE,
                vec![
                    ("tzid", tzid.to_string()),
                    ("message_to_code", u8::from(self.message_to_code).to_string()),
                    ("msg_list", "1".to_string()),
                ],
            )
            .map_err(RetryError::Fatal)?;
        let text = self.send_request(ACTION_STATE, url).await?;

        let entries = decode::<StateReply>(ACTION_STATE, &text)
            .map_err(RetryError::Transient)?
            .into_entries();

        match entries.first() {
            None => return Err(RetryError::Fatal(Error::EmptyState { tzid })),
            Some(first) if first.response.is_generic_failure() => {
                #[cfg(feature = "tracing")]
                warn!(tzid = %tzid, "State poll answered with a generic failure");
                return Err(RetryError::Fatal(Error::ServiceFailure {
                    action: ACTION_STATE,
                    code: first.response,
                }));
            }
            Some(_) => {}
        }

        #[cfg(feature = "tracing")]
        Span::current().set_status(Status::Ok);

        Ok(entries)
    }
}

impl Provider for OnlinesimClient {
    async fn fetch_balance(&self) -> Attempt<f64> {
        self.get_balance().await
    }

    async fn request_number(&self, service: &Service) -> Attempt<OperationId> {
        self.get_number(service).await
    }

    async fn poll_state(&self, tzid: OperationId) -> Attempt<Vec<StateEntry>> {
        self.get_state(tzid).await
    }
}

fn decode<T: DeserializeOwned>(action: &'static str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|source| Error::DeserializeJson { action, source })
}

/// Balance rule: success passes, a generic failure is fatal, anything else
/// is transient.
fn check_outcome(action: &'static str, code: OutcomeCode) -> Attempt<()> {
    match code {
        OutcomeCode::Success => Ok(()),
        OutcomeCode::GenericFailure => {
            #[cfg(feature = "tracing")]
            warn!(action, "Service answered with a generic failure");
            Err(RetryError::Fatal(Error::ServiceFailure { action, code }))
        }
        code => Err(RetryError::Transient(Error::UnexpectedOutcome { action, code })),
    }
}

/// Success passes, pending codes are transient, every other code is fatal.
fn check_terminal_outcome(action: &'static str, code: OutcomeCode) -> Attempt<()> {
    match code {
        OutcomeCode::Success => Ok(()),
        code if code.is_pending() => {
            Err(RetryError::Transient(Error::UnexpectedOutcome { action, code }))
        }
        OutcomeCode::GenericFailure => {
            #[cfg(feature = "tracing")]
            warn!(action, "Service answered with a generic failure");
            Err(RetryError::Fatal(Error::ServiceFailure { action, code }))
        }
        code => {
            #[cfg(feature = "tracing")]
            warn!(action, code = %code, "Service answered with a terminal code");
            Err(RetryError::Fatal(Error::UnexpectedOutcome { action, code }))
        }
    }
}
