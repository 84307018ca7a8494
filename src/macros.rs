//! Logging macros for ergonomic log message formatting.
//!
//! These macros work with any [`Sink`](crate::Sink), including an
//! `Arc<dyn Sink>`, and format their arguments like `format!`.
//!
//! # Examples
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use rust_log_pipeline::info;
//!
//! let sink = NullSink::new();
//!
//! // Basic logging
//! info!(sink, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(sink, "Server listening on port {}", port);
//! ```

/// Log a message at the given level with automatic formatting.
///
/// # Examples
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let sink = NullSink::new();
/// use rust_log_pipeline::log;
/// log!(sink, LogLevel::Info, "Simple message");
/// log!(sink, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($sink:expr, $level:expr, $($arg:tt)+) => {{
        use $crate::SinkExt as _;
        $sink.write($level, format!($($arg)+))
    }};
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let sink = NullSink::new();
/// use rust_log_pipeline::debug;
/// debug!(sink, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($sink:expr, $($arg:tt)+) => {
        $crate::log!($sink, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($sink:expr, $($arg:tt)+) => {
        $crate::log!($sink, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let sink = NullSink::new();
/// use rust_log_pipeline::warning;
/// warning!(sink, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warning {
    ($sink:expr, $($arg:tt)+) => {
        $crate::log!($sink, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($sink:expr, $($arg:tt)+) => {
        $crate::log!($sink, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// # Examples
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let sink = NullSink::new();
/// use rust_log_pipeline::critical;
/// critical!(sink, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! critical {
    ($sink:expr, $($arg:tt)+) => {
        $crate::log!($sink, $crate::LogLevel::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogLevel, Sink};
    use crate::testing::SpySink;
    use std::sync::Arc;

    #[test]
    fn test_log_macro() {
        let spy = SpySink::new("spy");
        log!(spy, LogLevel::Info, "Test message");
        log!(spy, LogLevel::Info, "Formatted: {}", 42);
        assert_eq!(spy.messages(), vec!["Test message", "Formatted: 42"]);
    }

    #[test]
    fn test_level_macros() {
        let spy = SpySink::new("spy");
        debug!(spy, "Count: {}", 5);
        info!(spy, "Items: {}", 100);
        warning!(spy, "Retry {} of {}", 1, 3);
        error!(spy, "Code: {}", 500);
        critical!(spy, "Critical failure: {}", "system");

        assert_eq!(spy.levels(), LogLevel::ALL.to_vec());
        assert_eq!(spy.messages()[2], "Retry 1 of 3");
    }

    #[test]
    fn test_macros_on_shared_sink() {
        let spy = Arc::new(SpySink::new("spy"));
        let shared: Arc<dyn Sink> = spy.clone();
        error!(shared, "through {}", "arc");
        assert_eq!(spy.messages(), vec!["through arc"]);
    }
}
