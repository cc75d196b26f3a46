//! Error types and retry signalling for OnlineSIM operations.

use crate::response::OutcomeCode;
use crate::types::OperationId;
use crate::utils::retry::ConfigError;
use thiserror::Error;

/// Outcome of a single failed attempt, tagged with whether retrying makes sense.
///
/// Operation drivers return this by value so the retrier never has to inspect
/// error types to decide whether to keep going.
///
/// # Examples
///
/// ```rust
/// use onlinesim::RetryError;
///
/// let err: RetryError<&str> = RetryError::Transient("connection reset");
/// assert!(!err.is_fatal());
/// assert_eq!(err.into_inner(), "connection reset");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The attempt failed but the same call may succeed later.
    Transient(E),
    /// The attempt failed in a way that retrying cannot fix.
    Fatal(E),
}

impl<E> RetryError<E> {
    /// Returns true if remaining attempts must be skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Borrow the wrapped cause.
    pub fn inner(&self) -> &E {
        match self {
            Self::Transient(e) | Self::Fatal(e) => e,
        }
    }

    /// Unwrap the cause, discarding the retry tag.
    pub fn into_inner(self) -> E {
        match self {
            Self::Transient(e) | Self::Fatal(e) => e,
        }
    }

    /// Map the wrapped cause while keeping the tag.
    pub fn map<F, U>(self, f: F) -> RetryError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            Self::Transient(e) => RetryError::Transient(f(e)),
            Self::Fatal(e) => RetryError::Fatal(f(e)),
        }
    }
}

/// Reasons the retrier stops without a result from the operation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RetryAbort {
    /// The attempt budget was zero, so the operation never ran.
    #[error("retry budget allows no attempts")]
    NoAttempts,
    /// The cancellation token fired before or between attempts.
    #[error("operation cancelled")]
    Cancelled,
}

/// Main error type for OnlineSIM client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to build HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// The configured endpoint is not a valid base URL.
    #[error("Invalid OnlineSIM endpoint: {0}")]
    InvalidEndpoint(#[source] url::ParseError),

    /// Error encoding the query string.
    #[error("Error building OnlineSIM request URL: {0}")]
    BuildRequestUrl(#[source] serde_urlencoded::ser::Error),

    /// Failed to send HTTP request.
    #[error("Failed to send HTTP request: {0}")]
    HttpRequest(#[from] reqwest_middleware::Error),

    /// The server answered with a non-success HTTP status.
    #[error("OnlineSIM {action} returned HTTP {status}")]
    HttpStatus { action: &'static str, status: u16 },

    /// Failed to read the response body.
    #[error("Failed to read response body: {0}")]
    ReadBody(#[source] reqwest::Error),

    /// The body did not match the expected response shape.
    #[error("Failed to deserialize {action} response: {source}")]
    DeserializeJson {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The service classified the request as a generic failure.
    #[error("OnlineSIM {action} failed: {code}")]
    ServiceFailure {
        action: &'static str,
        code: OutcomeCode,
    },

    /// The service answered with a classification other than success.
    #[error("OnlineSIM {action} answered {code}")]
    UnexpectedOutcome {
        action: &'static str,
        code: OutcomeCode,
    },

    /// A successful number request carried no operation id.
    #[error("Number request succeeded without an operation id")]
    MissingOperationId,

    /// The balance field is not a finite decimal number.
    #[error("Failed to parse balance {raw:?}")]
    InvalidBalance { raw: String },

    /// The state poll returned no entries.
    #[error("State poll for operation {tzid} returned no entries")]
    EmptyState { tzid: OperationId },

    /// The operation has not reached a terminal state yet.
    #[error("Operation {tzid} still pending ({code})")]
    Pending { tzid: OperationId, code: OutcomeCode },

    /// The operation ended in a state that carries no message.
    #[error("Operation {tzid} ended in unexpected state {code}")]
    UnexpectedState { tzid: OperationId, code: OutcomeCode },

    /// The retry budget was zero.
    #[error("Retry budget allows no attempts")]
    NoAttempts,

    /// The operation was cancelled through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    /// The API key environment variable is not set.
    #[error("Environment variable {var} is not set")]
    MissingApiKey { var: &'static str },

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result of one classified attempt.
pub type Attempt<T> = std::result::Result<T, RetryError<Error>>;

impl From<RetryAbort> for Error {
    fn from(abort: RetryAbort) -> Self {
        match abort {
            RetryAbort::NoAttempts => Error::NoAttempts,
            RetryAbort::Cancelled => Error::Cancelled,
        }
    }
}

impl Error {
    /// Returns true if this error is transient when raised by a single call.
    ///
    /// Drivers tag their failures explicitly; this is the classification used
    /// for errors that surface to callers, e.g. to decide whether to re-run a
    /// whole workflow.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::HttpRequest(_) | Error::ReadBody(_) | Error::Pending { .. } => true,
            Error::UnexpectedOutcome { code, .. } => code.is_pending(),
            Error::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Error::BuildHttpClient(_)
            | Error::InvalidEndpoint(_)
            | Error::BuildRequestUrl(_)
            | Error::DeserializeJson { .. }
            | Error::ServiceFailure { .. }
            | Error::MissingOperationId
            | Error::InvalidBalance { .. }
            | Error::EmptyState { .. }
            | Error::UnexpectedState { .. }
            | Error::NoAttempts
            | Error::Cancelled
            | Error::MissingApiKey { .. }
            | Error::InvalidConfig(_) => false,
        }
    }
}
