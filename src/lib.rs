//! # Rust Log Pipeline
//!
//! A resilient, asynchronous, multi-sink log delivery pipeline.
//!
//! Records flow through a tree of [`Sink`]s: a [`BackgroundDispatcher`]
//! takes records off the caller's thread, a [`SeverityFilter`] drops the
//! ones below a threshold, and a [`CompositeSink`] fans them out to leaf
//! destinations. When a destination fails, the dispatcher hands the
//! affected records to an emergency sink instead of losing them.
//!
//! ## Features
//!
//! - **Non-blocking**: producers only enqueue; delivery runs on a worker thread
//! - **Failure isolation**: a failing or panicking sink never breaks its siblings
//! - **Fallback delivery**: rejected records are rerouted to an emergency sink
//! - **Bounded shutdown**: disposal drains the queue but never hangs forever
//!
//! ## Example
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! let console: Arc<dyn Sink> = Arc::new(ConsoleSink::new());
//! let files: Arc<dyn Sink> = Arc::new(NullSink::new());
//! let tree = CompositeSink::new(vec![console, files]).unwrap();
//!
//! let logger = BackgroundDispatcher::builder(Arc::new(tree))
//!     .min_level(LogLevel::Warning)
//!     .emergency(Arc::new(ConsoleSink::new()))
//!     .build()
//!     .unwrap();
//!
//! logger.warning("cache miss rate above 40%");
//! logger.dispose();
//! ```

pub mod bridge;
pub mod compose;
pub mod core;
pub mod macros;
pub mod sinks;
pub mod testing;

pub mod prelude {
    pub use crate::core::{
        BackgroundDispatcher, CompositeSink, DispatcherBuilder, DispatcherState, ExceptionInfo,
        ExtraFields, FieldValue, LambdaSink, LevelVerifier, LogLevel, LogRecord, LoggerError,
        OverflowPolicy, Result, SeverityFilter, Sink, SinkExt, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{ConsoleSink, FileSink, JsonFileSink, NullSink, RollingFileSink};
}

pub use crate::core::{
    diagnostics, registry, BackgroundDispatcher, CompositeSink, CompositeSinkBuilder,
    DiagnosticHook, DispatcherBuilder, DispatcherConfig, DispatcherMetrics, DispatcherState,
    ExceptionInfo, ExtraFields, FailureCallback, FieldValue, LambdaSink, LevelRange,
    LevelVerifier, LogLevel, LogRecord, LoggerError, MinimumLevel, OverflowCallback,
    OverflowPolicy, Result, SeverityFilter, Sink, SinkExt, SinkSwitch, DEFAULT_LINGER,
    DEFAULT_MAX_BATCH, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use crate::sinks::{ConsoleSink, FileSink, JsonFileSink, NullSink, RollingFileSink};
