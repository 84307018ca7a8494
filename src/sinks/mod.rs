//! Leaf sinks writing to physical destinations

pub mod console;
pub mod file;
pub mod json;
pub mod null;
pub mod rolling_file;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use json::JsonFileSink;
pub use null::NullSink;
pub use rolling_file::RollingFileSink;

use crate::core::LogRecord;

/// Timestamp layout used by the text sinks
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Render a record as `[LEVEL] message`, optionally prefixed by its
/// timestamp, with extra fields and exception lines appended
pub fn format_text(record: &LogRecord, with_timestamp: bool) -> String {
    let mut line = String::with_capacity(record.message().len() + 32);

    if with_timestamp {
        line.push('[');
        line.push_str(&record.timestamp().format(TIMESTAMP_FORMAT).to_string());
        line.push_str("] ");
    }

    line.push('[');
    line.push_str(record.level().to_str());
    line.push_str("] ");
    line.push_str(record.message());

    if !record.extra().is_empty() {
        line.push_str(" | ");
        line.push_str(&record.extra().format_fields());
    }

    if let Some(exception) = record.exception() {
        line.push_str("\n    ");
        line.push_str(&exception.type_name);
        line.push_str(": ");
        line.push_str(&exception.message);
        if let Some(ref trace) = exception.stack_trace {
            for frame in trace.lines() {
                line.push_str("\n    ");
                line.push_str(frame);
            }
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExceptionInfo, LogLevel};

    #[test]
    fn test_format_plain() {
        let record = LogRecord::new(LogLevel::Warning, "disk low");
        assert_eq!(format_text(&record, false), "[WARNING] disk low");
    }

    #[test]
    fn test_format_with_fields_and_exception() {
        let record = LogRecord::new(LogLevel::Error, "failed")
            .with_field("event_id", 42)
            .with_exception(
                ExceptionInfo::new("IoError", "broken pipe").with_stack_trace("caused by: eof"),
            );

        let text = format_text(&record, false);
        assert_eq!(
            text,
            "[ERROR] failed | event_id=42\n    IoError: broken pipe\n    caused by: eof"
        );
    }

    #[test]
    fn test_format_with_timestamp_prefix() {
        let record = LogRecord::new(LogLevel::Info, "started");
        let text = format_text(&record, true);
        assert!(text.starts_with('['));
        assert!(text.ends_with("[INFO] started"));
    }
}
