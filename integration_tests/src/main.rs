//! Integration tests for the micro:bit blocks firmware.
//!
//! Run after flashing the firmware. Connects over BLE, checks the profile
//! and exercises the UART service.

mod ble_client;
mod profile;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::MicrobitClient;
use tests::{print_results, run_all_tests};

#[derive(Parser)]
#[command(name = "ble-tests")]
#[command(about = "Integration tests for the micro:bit blocks firmware")]
struct Args {
    /// Advertised name, e.g. "BBC micro:bit [zuzuz]" (default: first micro:bit found)
    #[arg(long)]
    name: Option<String>,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("{}", "micro:bit Blocks Integration Tests".bold());
    match &args.name {
        Some(name) => println!("Scanning for \"{}\"...", name),
        None => println!("Scanning for any micro:bit..."),
    }

    let client =
        MicrobitClient::connect(args.name.as_deref(), Duration::from_secs(args.scan_timeout))
            .await?;
    println!("{} {}", "Connected to".green(), client.name());

    // Let the board finish starting its services
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("\nRunning tests...\n");

    let results = run_all_tests(&client).await;
    print_results(&results);

    client.disconnect().await?;

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
