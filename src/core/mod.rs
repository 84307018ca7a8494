//! Core pipeline types and traits

pub mod composite;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod extra;
pub mod filter;
pub mod lambda;
pub mod log_level;
pub mod log_record;
pub mod metrics;
pub mod overflow_policy;
pub mod registry;
pub mod sink;

pub use composite::{CompositeSink, CompositeSinkBuilder};
pub use diagnostics::DiagnosticHook;
pub use dispatcher::{
    BackgroundDispatcher, DispatcherBuilder, DispatcherConfig, DispatcherState, FailureCallback,
    DEFAULT_LINGER, DEFAULT_MAX_BATCH, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use error::{LoggerError, Result};
pub use extra::{ExtraFields, FieldValue};
pub use filter::{LevelRange, LevelVerifier, MinimumLevel, SeverityFilter};
pub use lambda::{BatchFn, LambdaSink, RecordFn};
pub use log_level::LogLevel;
pub use log_record::{ExceptionInfo, LogRecord};
pub use metrics::DispatcherMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use sink::{Sink, SinkExt, SinkSwitch};
