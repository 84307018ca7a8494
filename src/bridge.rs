//! Bridge from external logging facades into the pipeline
//!
//! [`ExternalLevel`] models a host framework's seven-value severity scale and
//! folds it onto [`LogLevel`]. With the `log-bridge` feature, [`FacadeBridge`]
//! also plugs a sink in behind the `log` crate macros.

use crate::core::LogLevel;

/// Severity scale used by host frameworks, in their numeric order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalLevel {
    Trace,
    Debug,
    Information,
    Warning,
    Error,
    Critical,
    None,
}

impl ExternalLevel {
    /// Decode a numeric code (0 = Trace .. 6 = None); other codes are unrecognised
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExternalLevel::Trace),
            1 => Some(ExternalLevel::Debug),
            2 => Some(ExternalLevel::Information),
            3 => Some(ExternalLevel::Warning),
            4 => Some(ExternalLevel::Error),
            5 => Some(ExternalLevel::Critical),
            6 => Some(ExternalLevel::None),
            _ => None,
        }
    }
}

impl From<ExternalLevel> for LogLevel {
    fn from(level: ExternalLevel) -> Self {
        match level {
            ExternalLevel::Trace | ExternalLevel::Debug => LogLevel::Debug,
            ExternalLevel::Information => LogLevel::Info,
            ExternalLevel::Warning => LogLevel::Warning,
            ExternalLevel::Error => LogLevel::Error,
            ExternalLevel::Critical | ExternalLevel::None => LogLevel::Critical,
        }
    }
}

/// Map a raw external code; anything unrecognised becomes `Critical`
pub fn map_external_code(code: i32) -> LogLevel {
    ExternalLevel::from_code(code).map_or(LogLevel::Critical, LogLevel::from)
}

#[cfg(feature = "log-bridge")]
pub use self::facade::FacadeBridge;

#[cfg(feature = "log-bridge")]
mod facade {
    use super::ExternalLevel;
    use crate::core::{registry, LogLevel, LogRecord, LoggerError, Result, Sink};
    use std::sync::Arc;

    impl From<log::Level> for LogLevel {
        fn from(level: log::Level) -> Self {
            match level {
                log::Level::Trace | log::Level::Debug => LogLevel::Debug,
                log::Level::Info => LogLevel::Info,
                log::Level::Warn => LogLevel::Warning,
                log::Level::Error => LogLevel::Error,
            }
        }
    }

    /// `log::Log` implementation that forwards to a [`Sink`]
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_log_pipeline::bridge::FacadeBridge;
    /// use rust_log_pipeline::sinks::ConsoleSink;
    /// use std::sync::Arc;
    ///
    /// FacadeBridge::install(Arc::new(ConsoleSink::new()), log::LevelFilter::Info).unwrap();
    /// log::warn!("routed through the pipeline");
    /// ```
    pub struct FacadeBridge {
        sink: Arc<dyn Sink>,
    }

    impl FacadeBridge {
        pub fn new(sink: Arc<dyn Sink>) -> Self {
            Self { sink }
        }

        /// Register a bridge as the global `log` logger and fill the ambient slot
        ///
        /// # Errors
        ///
        /// `InvalidConfiguration` if a `log` logger is already installed.
        pub fn install(sink: Arc<dyn Sink>, max_level: log::LevelFilter) -> Result<()> {
            log::set_boxed_logger(Box::new(Self::new(Arc::clone(&sink))))
                .map_err(|e| LoggerError::config("FacadeBridge", e.to_string()))?;
            log::set_max_level(max_level);
            registry::set_current(sink);
            Ok(())
        }

        pub fn sink(&self) -> &Arc<dyn Sink> {
            &self.sink
        }

        /// Forward a host-framework event, keeping its id as `event_id`
        pub fn log_event(&self, level: ExternalLevel, event_id: i64, message: impl AsRef<str>) {
            let record = LogRecord::new(level.into(), message).with_field("event_id", event_id);
            let _ = self.sink.log(&record);
        }

        pub fn to_record(record: &log::Record<'_>) -> LogRecord {
            let mut converted = LogRecord::new(record.level().into(), record.args().to_string())
                .with_field("target", record.target());
            if let Some(module) = record.module_path() {
                converted = converted.with_field("module_path", module);
            }
            if let Some(file) = record.file() {
                converted = converted.with_field("file", file);
            }
            if let Some(line) = record.line() {
                converted = converted.with_field("line", line);
            }
            converted
        }
    }

    impl log::Log for FacadeBridge {
        fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
            self.sink.is_enabled()
        }

        fn log(&self, record: &log::Record<'_>) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let _ = self.sink.log(&Self::to_record(record));
        }

        fn flush(&self) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_mapping() {
        assert_eq!(LogLevel::from(ExternalLevel::Trace), LogLevel::Debug);
        assert_eq!(LogLevel::from(ExternalLevel::Debug), LogLevel::Debug);
        assert_eq!(LogLevel::from(ExternalLevel::Information), LogLevel::Info);
        assert_eq!(LogLevel::from(ExternalLevel::Warning), LogLevel::Warning);
        assert_eq!(LogLevel::from(ExternalLevel::Error), LogLevel::Error);
        assert_eq!(LogLevel::from(ExternalLevel::Critical), LogLevel::Critical);
        assert_eq!(LogLevel::from(ExternalLevel::None), LogLevel::Critical);
    }

    #[test]
    fn test_unrecognised_code_is_critical() {
        assert_eq!(map_external_code(2), LogLevel::Info);
        assert_eq!(map_external_code(-1), LogLevel::Critical);
        assert_eq!(map_external_code(42), LogLevel::Critical);
    }

    #[cfg(feature = "log-bridge")]
    #[test]
    fn test_facade_record_conversion() {
        use crate::core::FieldValue;

        let record = log::Record::builder()
            .args(format_args!("request done"))
            .level(log::Level::Warn)
            .target("http")
            .line(Some(12))
            .build();
        let converted = FacadeBridge::to_record(&record);

        assert_eq!(converted.level(), LogLevel::Warning);
        assert_eq!(converted.message(), "request done");
        assert_eq!(
            converted.extra().get("target"),
            Some(&FieldValue::String("http".to_string()))
        );
        assert_eq!(converted.extra().get("line"), Some(&FieldValue::Int(12)));
    }

    #[cfg(feature = "log-bridge")]
    #[test]
    fn test_log_event_carries_id() {
        use crate::core::FieldValue;
        use crate::testing::SpySink;
        use std::sync::Arc;

        let spy = Arc::new(SpySink::new("spy"));
        let bridge = FacadeBridge::new(spy.clone());
        bridge.log_event(ExternalLevel::Information, 1001, "started");

        let records = spy.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level(), LogLevel::Info);
        assert_eq!(records[0].extra().get("event_id"), Some(&FieldValue::Int(1001)));
    }
}
