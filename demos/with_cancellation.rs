//! Example demonstrating cancellation functionality.
//!
//! This example shows how to use `get_sms_cancellable` to stop SMS polling
//! from another task.
//!
//! # Running
//!
//! ```bash
//! ONLINESIM_API_KEY=your_api_key cargo run --example with_cancellation
//! ```

use onlinesim::{
    Alpha2, CancellationToken, Error, OnlinesimClient, Service, SmsService, SmsServiceConfig,
    SmsServiceTrait,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var(onlinesim::API_KEY_ENV)?;

    // Numbers from Ukraine instead of the default Russia
    let client = OnlinesimClient::builder(api_key)
        .country_of(&Alpha2::UA.to_country())
        .build()?;

    let service = SmsService::new(client, SmsServiceConfig::patient());

    println!("Requesting phone number...");
    let allocation = service.get_number(Service::Whatsapp).await?;
    println!("Operation ID: {}", allocation.operation_id);

    let cancel_token = CancellationToken::new();
    let token_clone = cancel_token.clone();

    // Give up after 30 seconds if no SMS arrived
    let cancel_handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        println!("Cancelling operation...");
        token_clone.cancel();
    });

    println!("\nWaiting for SMS (cancellable)...");
    match service
        .get_sms_cancellable(allocation.operation_id, 20, cancel_token)
        .await
    {
        Ok(texts) => {
            cancel_handle.abort();
            println!("Received: {texts:?}");
        }
        Err(Error::Cancelled) => println!("Operation was cancelled"),
        Err(Error::Pending { code, .. }) => println!("Gave up while still {code}"),
        Err(e) => println!("Error: {e}"),
    }

    Ok(())
}
