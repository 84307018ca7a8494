//! File logging example
//!
//! Demonstrates a console sink and file sinks composed into one pipeline.
//!
//! Run with: cargo run --example file_logging

use rust_log_pipeline::compose::{self, ConsolePolicy, PipelineConfig};
use rust_log_pipeline::prelude::*;
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - File Logging Example ===\n");

    let console: Arc<dyn Sink> = Arc::new(ConsoleSink::new());
    let text: Arc<dyn Sink> = Arc::new(FileSink::new("application.log")?);
    let json: Arc<dyn Sink> = Arc::new(JsonFileSink::new("application.jsonl")?);
    let tree = CompositeSink::new(vec![console, text, json])?;

    let logger = BackgroundDispatcher::builder(Arc::new(tree))
        .name("file-demo")
        .min_level(LogLevel::Info)
        .emergency(Arc::new(ConsoleSink::new()))
        .build()?;

    println!("1. Logging to console, text file and JSON file:");
    logger.info("Application started");
    logger.debug("Loading configuration...");
    logger.info("Configuration loaded successfully");
    logger.warning("Using default settings for some options");
    logger.error("Failed to load optional plugin");

    println!("\n2. Performing some operations:");
    for i in 1..=5 {
        let record = LogRecord::new(LogLevel::Info, format!("Processing item {}/5", i))
            .with_field("item", i);
        logger.log(&record)?;
        if i == 3 {
            logger.warning("Item 3 took longer than expected");
        }
    }

    logger.info("All operations completed");
    logger.dispose();

    println!("\n3. Daily rolling files:");
    let config = PipelineConfig {
        folder: "Logs".into(),
        min_level: LogLevel::Warning,
        console: ConsolePolicy::Never,
        ..PipelineConfig::default()
    };
    let rolling = compose::rolling_file_pipeline(&config)?;
    rolling.warning("Written to today's file under Logs/");
    rolling.info("Below the threshold, not written");
    rolling.dispose();

    println!("\n=== Example completed successfully! ===");
    println!("Check 'application.log', 'application.jsonl' and 'Logs/' for the output");

    Ok(())
}
