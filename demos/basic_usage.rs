//! Basic usage example for the OnlineSIM client.
//!
//! Checks the balance, rents a number and waits for the verification SMS.
//!
//! # Running
//!
//! ```bash
//! ONLINESIM_API_KEY=your_api_key cargo run --example basic_usage
//! ```

use onlinesim::{OnlinesimClient, Service, SmsService, SmsServiceTrait};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reads ONLINESIM_API_KEY
    let client = OnlinesimClient::from_env()?;
    let service = SmsService::with_provider(client);

    let balance = service.get_balance().await?;
    println!("Balance: {balance}");

    println!("Requesting phone number...");
    let allocation = service.get_number(Service::Telegram).await?;

    for number in &allocation.numbers {
        println!("Got phone number: {}", number.with_plus_prefix());
    }
    println!("Operation ID: {}", allocation.operation_id);

    println!("\nWaiting for SMS...");
    let texts = service.get_sms(allocation.operation_id, 12).await?;
    for text in texts {
        println!("Received: {text}");
    }

    Ok(())
}
