//! Provider trait: one classified attempt per remote operation.

use crate::errors::Attempt;
use crate::response::StateEntry;
use crate::services::Service;
use crate::types::OperationId;
use std::future::Future;
use std::sync::Arc;

/// Operations the workflow layer needs from the remote service.
///
/// Each method performs exactly one request and classifies the result into
/// success, [`RetryError::Transient`](crate::RetryError::Transient) or
/// [`RetryError::Fatal`](crate::RetryError::Fatal). Retrying is the caller's
/// job.
///
/// # Example
///
/// ```rust,ignore
/// use onlinesim::{Attempt, OperationId, Provider, Service, StateEntry};
///
/// struct MyProvider;
///
/// impl Provider for MyProvider {
///     async fn fetch_balance(&self) -> Attempt<f64> {
///         Ok(100.0)
///     }
///
///     async fn request_number(&self, service: &Service) -> Attempt<OperationId> {
///         Ok(OperationId::new(1))
///     }
///
///     async fn poll_state(&self, tzid: OperationId) -> Attempt<Vec<StateEntry>> {
///         Ok(Vec::new())
///     }
/// }
/// ```
pub trait Provider: Send + Sync {
    /// Query the account balance.
    fn fetch_balance(&self) -> impl Future<Output = Attempt<f64>> + Send;

    /// Request a number for `service` and return the new operation id.
    fn request_number(
        &self,
        service: &Service,
    ) -> impl Future<Output = Attempt<OperationId>> + Send;

    /// Poll the state of the numbers held under `tzid`.
    ///
    /// The returned sequence is never empty.
    fn poll_state(
        &self,
        tzid: OperationId,
    ) -> impl Future<Output = Attempt<Vec<StateEntry>>> + Send;
}

impl<P: Provider> Provider for Arc<P> {
    fn fetch_balance(&self) -> impl Future<Output = Attempt<f64>> + Send {
        P::fetch_balance(self)
    }

    fn request_number(
        &self,
        service: &Service,
    ) -> impl Future<Output = Attempt<OperationId>> + Send {
        P::request_number(self, service)
    }

    fn poll_state(
        &self,
        tzid: OperationId,
    ) -> impl Future<Output = Attempt<Vec<StateEntry>>> + Send {
        P::poll_state(self, tzid)
    }
}
