//! Service trait definition.

use crate::errors::Result;
use crate::services::Service;
use crate::types::{NumberAllocation, OperationId};
use std::future::Future;

/// Trait for OnlineSIM workflow implementations.
///
/// These three operations are the public contract; everything else is
/// plumbing behind them.
pub trait SmsServiceTrait: Send + Sync {
    /// Get the current account balance.
    fn get_balance(&self) -> impl Future<Output = Result<f64>> + Send;

    /// Request a number for `service` and read the number(s) allocated to it.
    ///
    /// # Arguments
    ///
    /// * `service` - The service to get a number for (e.g., Telegram)
    ///
    /// # Returns
    ///
    /// The allocated numbers and the operation id to poll.
    fn get_number(&self, service: Service) -> impl Future<Output = Result<NumberAllocation>> + Send;

    /// Poll operation `tzid` until every held number has an answer.
    ///
    /// # Arguments
    ///
    /// * `tzid` - The operation id from `get_number`
    /// * `max_attempts` - Total number of polls, the first one included
    ///
    /// # Returns
    ///
    /// The texts of all received messages, in the order the service lists them.
    fn get_sms(
        &self,
        tzid: OperationId,
        max_attempts: u32,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}
