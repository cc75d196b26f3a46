//! Example demonstrating retry callbacks.
//!
//! This example shows how to use the `with_on_retry` callback to get
//! notified when retries occur.
//!
//! # Running
//!
//! ```bash
//! ONLINESIM_API_KEY=your_api_key cargo run --example retry_callbacks
//! ```

use onlinesim::{OnlinesimClient, RetryConfig, SmsService, SmsServiceConfig, SmsServiceTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = OnlinesimClient::from_env()?;

    let retry_count = Arc::new(AtomicU32::new(0));
    let retry_count_clone = Arc::clone(&retry_count);

    let config = SmsServiceConfig::default().with_retry(
        RetryConfig::default()
            .with_initial_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(10))
            .with_max_attempts(5),
    );

    let service = SmsService::builder(client)
        .config(config)
        .build()?
        .with_on_retry(move |error, duration| {
            let count = retry_count_clone.fetch_add(1, Ordering::SeqCst) + 1;
            println!(
                "[RETRY #{count}] Error: {error} | Next retry in: {:.1}s",
                duration.as_secs_f64()
            );
        });

    let balance = service.get_balance().await?;
    println!("Balance: {balance}");
    println!("Retries: {}", retry_count.load(Ordering::SeqCst));

    Ok(())
}
