//! Log record structure

use super::extra::{ExtraFields, FieldValue};
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// Structured error attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack_trace: None,
        }
    }

    #[must_use]
    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    /// Capture an error, rendering its `source()` chain as the trace
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            type_name: std::any::type_name::<E>().to_string(),
            message: error.to_string(),
            stack_trace: if chain.is_empty() {
                None
            } else {
                Some(chain.join("\n"))
            },
        }
    }
}

/// One immutable log entry
///
/// Fields are only reachable through accessors; the `with_*` builders
/// consume the record, so a record handed to a sink can no longer change.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    #[serde(skip)]
    monotonic: Instant,
    level: LogLevel,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<ExceptionInfo>,
    #[serde(skip_serializing_if = "ExtraFields::is_empty")]
    extra: ExtraFields,
}

impl LogRecord {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, message: impl AsRef<str>) -> Self {
        Self {
            timestamp: Utc::now(),
            monotonic: Instant::now(),
            level,
            message: Self::sanitize_message(message.as_ref()),
            exception: None,
            extra: ExtraFields::new(),
        }
    }

    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    #[must_use]
    pub fn with_error<E>(self, error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        self.with_exception(ExceptionInfo::from_error(error))
    }

    #[must_use]
    pub fn with_extra(mut self, extra: ExtraFields) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.extra.add_field(key, value);
        self
    }

    /// Override the wall-clock timestamp (replaying or testing)
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn monotonic(&self) -> Instant {
        self.monotonic
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exception(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    pub fn extra(&self) -> &ExtraFields {
        &self.extra
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "socket closed")
        }
    }

    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "query failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_message_sanitized() {
        let record = LogRecord::new(LogLevel::Info, "line1\nline2\tend");
        assert_eq!(record.message(), "line1\\nline2\\tend");
    }

    #[test]
    fn test_empty_message_accepted() {
        let record = LogRecord::new(LogLevel::Warning, "");
        assert_eq!(record.message(), "");
        assert_eq!(record.level(), LogLevel::Warning);
    }

    #[test]
    fn test_exception_from_error_chain() {
        let info = ExceptionInfo::from_error(&Outer(Inner));
        assert_eq!(info.message, "query failed");
        assert!(info.type_name.ends_with("Outer"));
        assert_eq!(info.stack_trace.as_deref(), Some("caused by: socket closed"));
    }

    #[test]
    fn test_json_skips_empty_parts() {
        let record = LogRecord::new(LogLevel::Error, "boom");
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["level"], "Error");
        assert_eq!(json["message"], "boom");
        assert!(json.get("exception").is_none());
        assert!(json.get("extra").is_none());
        assert!(json.get("monotonic").is_none());
    }

    #[test]
    fn test_with_field() {
        let record = LogRecord::new(LogLevel::Info, "request").with_field("event_id", 7);
        assert_eq!(record.extra().get("event_id"), Some(&FieldValue::Int(7)));
    }
}
