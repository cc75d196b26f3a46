//! Number provisioning and SMS retrieval workflows.

pub(crate) mod config;
pub(crate) mod structure;
pub(crate) mod traits;

pub use config::{SmsServiceConfig, SmsServiceConfigBuilder};
pub use structure::{SmsService, SmsServiceBuilder};
pub use traits::SmsServiceTrait;
