//! Basic pipeline usage example
//!
//! Demonstrates a console sink behind a severity filter and the logging macros.
//!
//! Run with: cargo run --example basic_usage

use rust_log_pipeline::prelude::*;
use rust_log_pipeline::{info, warning};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - Basic Usage Example ===\n");

    let console: Arc<dyn Sink> = Arc::new(ConsoleSink::new());
    let filter = SeverityFilter::new(Arc::clone(&console), LogLevel::Debug);

    println!("1. Logging at different levels:");
    filter.debug("This is a debug message");
    filter.info("This is an info message");
    filter.warning("This is a warning message");
    filter.error("This is an error message");
    filter.critical("This is a critical message");

    println!("\n2. Raising the threshold at runtime:");
    filter.set_min_level(LogLevel::Warning);
    println!("   Minimum level set to WARNING - debug and info won't show:");
    filter.debug("Debug message (hidden)");
    info!(filter, "Info message {} (hidden)", 2);
    warning!(filter, "Warning message {} (visible)", 3);

    println!("\n3. Structured fields and errors:");
    let record = LogRecord::new(LogLevel::Error, "Payment declined")
        .with_field("order_id", 1042)
        .with_field("retryable", false);
    filter.log(&record)?;

    let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "gateway reset");
    filter.error_with("Gateway call failed", &cause);

    filter.dispose();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
