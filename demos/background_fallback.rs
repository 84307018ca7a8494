//! Background delivery with an emergency sink
//!
//! A main sink that fails every third call sits behind a background
//! dispatcher; the records it rejects are rerouted to the console.
//!
//! Run with: cargo run --example background_fallback

use rust_log_pipeline::prelude::*;
use rust_log_pipeline::testing::FailingSink;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - Background Fallback Example ===\n");

    let flaky = Arc::new(FailingSink::on_calls("flaky-db", [3, 6, 9]));
    let emergency = LambdaSink::new(|record| {
        println!("   [EMERGENCY] {}", record.message());
        Ok(())
    })
    .with_name("stdout-emergency");

    let dispatcher = BackgroundDispatcher::builder(flaky.clone())
        .name("demo")
        .emergency(Arc::new(emergency))
        .min_level(LogLevel::Info)
        .on_failure(Arc::new(|e: &LoggerError| println!("   [FAILURE] {}", e)))
        .build()?;

    println!("1. Logging ten records; calls 3, 6 and 9 fail:");
    for i in 1..=10 {
        dispatcher.info(format!("Order {} shipped", i));
    }
    dispatcher.debug("Filtered before the queue");

    if !dispatcher.flush(Duration::from_secs(2)) {
        eprintln!("Warning: flush timed out");
    }

    let metrics = dispatcher.metrics();
    println!("\n2. Metrics:");
    println!("   enqueued:  {}", metrics.enqueued_count());
    println!("   delivered: {}", metrics.delivered_count());
    println!("   rerouted:  {}", metrics.rerouted_count());
    println!("   lost:      {}", metrics.lost_count());
    println!("   main sink kept {} record(s)", flaky.accepted().len());

    if !dispatcher.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
        eprintln!("Warning: dispatcher shutdown timed out");
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
