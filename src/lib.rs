//! # OnlineSIM
//!
//! Async client for the OnlineSIM virtual number service.
//!
//! The crate rents a temporary phone number for a target service (Telegram,
//! WhatsApp, ...) and polls the operation until the verification SMS arrives.
//! Every remote call goes through a bounded exponential backoff with jitter;
//! drivers tag each failure as transient or fatal so the retrier never has to
//! guess.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use onlinesim::{OnlinesimClient, Service, SmsService, SmsServiceTrait};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ONLINESIM_API_KEY
//!     let client = OnlinesimClient::from_env()?;
//!     let service = SmsService::with_provider(client);
//!
//!     println!("Balance: {}", service.get_balance().await?);
//!
//!     let allocation = service.get_number(Service::Telegram).await?;
//!     println!("Got number: {}", allocation.numbers[0]);
//!
//!     let texts = service.get_sms(allocation.operation_id, 10).await?;
//!     println!("Got messages: {:?}", texts);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SmsService<P>       (workflows: get_balance, get_number, get_sms)
//!         │
//!         ▼
//!     Retrier         (bounded backoff, jitter, cancellation)
//!         │
//!         ▼
//!     Provider        (trait: one classified attempt per call)
//!         │
//!         ▼
//! OnlinesimClient     (HTTP + response classification)
//! ```
//!
//! ## Features
//!
//! - `tracing` - OpenTelemetry tracing instrumentation (enabled by default)

pub mod client;
pub mod errors;
pub mod provider;
pub mod response;
pub mod service;
pub mod services;
pub mod types;
pub mod utils;

// Re-export commonly used types at the crate root
pub use client::{API_KEY_ENV, DEFAULT_API_URL, OnlinesimClient, OnlinesimClientBuilder};
pub use errors::{Attempt, Error, Result, RetryAbort, RetryError};
pub use provider::Provider;
pub use response::{
    BalanceResponse, NumberResponse, OutcomeCode, SmsMessage, StateEntry, StateReply,
};
pub use service::{
    SmsService, SmsServiceBuilder, SmsServiceConfig, SmsServiceConfigBuilder, SmsServiceTrait,
};
pub use services::Service;
pub use types::{DialCode, DialCodeError, FullNumber, NumberAllocation, OperationId, SmsCode};
pub use utils::dial_code::country_to_dial_code;
pub use utils::retry::{Backoff, ConfigError, OnRetryCallback, Retrier, RetryConfig};

// Re-export external types users need
pub use keshvar::{Alpha2, Country};
pub use tokio_util::sync::CancellationToken;
