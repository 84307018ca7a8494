//! Standard pipeline layouts
//!
//! Ready-made trees for the common setups: a rolling file log with an
//! optional console mirror, an arbitrary main sink with a caller-supplied
//! emergency sink, and a synchronous crash report for failures that happen
//! before any pipeline exists.

use crate::core::{
    BackgroundDispatcher, CompositeSink, ExceptionInfo, LambdaSink, LogLevel, LogRecord, Result,
    SeverityFilter, Sink,
};
use crate::sinks::{console::CONSOLE_SINK_NAME, ConsoleSink, FileSink, RollingFileSink};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// File name used by [`run_reporting_crash`]
pub const CRASH_LOG_FILE: &str = "crash.log";

pub const CRASH_MESSAGE: &str = "Application startup exception";

/// Whether a console sink joins the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolePolicy {
    Always,
    Never,
    /// Only when stderr is attached to a terminal
    #[default]
    WhenInteractive,
}

impl ConsolePolicy {
    pub fn participates(self) -> bool {
        match self {
            ConsolePolicy::Always => true,
            ConsolePolicy::Never => false,
            ConsolePolicy::WhenInteractive => is_interactive(),
        }
    }
}

/// True when stderr is a terminal
pub fn is_interactive() -> bool {
    std::io::stderr().is_terminal()
}

/// True for sinks that already write to the console, looking through
/// filters, composites and dispatchers
pub fn is_console_sink(sink: &dyn Sink) -> bool {
    sink.writes_to_console()
}

/// Settings for the standard layouts
///
/// # Example
///
/// ```
/// use rust_log_pipeline::compose::{ConsolePolicy, PipelineConfig};
/// use rust_log_pipeline::LogLevel;
///
/// let config = PipelineConfig::from_json_str(
///     r#"{ "folder": "var/log", "min_level": "Warning", "console": "never" }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.min_level, LogLevel::Warning);
/// assert_eq!(config.console, ConsolePolicy::Never);
/// assert_eq!(config.console_min_level, LogLevel::Info);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub folder: PathBuf,
    pub min_level: LogLevel,
    pub console_min_level: LogLevel,
    pub console: ConsolePolicy,
    pub queue_capacity: Option<usize>,
    pub max_batch: usize,
    pub linger_ms: u64,
    pub shutdown_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("Logs"),
            min_level: LogLevel::Error,
            console_min_level: LogLevel::Info,
            console: ConsolePolicy::default(),
            queue_capacity: None,
            max_batch: crate::core::DEFAULT_MAX_BATCH,
            linger_ms: crate::core::DEFAULT_LINGER.as_millis() as u64,
            shutdown_timeout_ms: crate::core::DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64,
        }
    }
}

impl PipelineConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn dispatcher(&self, name: &str, main: Arc<dyn Sink>) -> crate::core::DispatcherBuilder {
        let mut builder = BackgroundDispatcher::builder(main)
            .name(name)
            .max_batch(self.max_batch)
            .linger(Duration::from_millis(self.linger_ms))
            .shutdown_timeout(Duration::from_millis(self.shutdown_timeout_ms));
        if let Some(capacity) = self.queue_capacity {
            builder = builder.queue_capacity(capacity);
        }
        builder
    }

    fn console(&self) -> Arc<dyn Sink> {
        Arc::new(SeverityFilter::new(
            Arc::new(ConsoleSink::new()),
            self.console_min_level,
        ))
    }
}

/// Emergency sink that prints single records to the console and ignores
/// batch rewrites, so only the failure description shows up
pub fn console_emergency(min_level: LogLevel) -> LambdaSink {
    let console = ConsoleSink::new();
    LambdaSink::new(move |record| {
        if record.level() >= min_level {
            console.log(record)
        } else {
            Ok(())
        }
    })
    .with_batch(|_batch| Ok(()))
    .with_name(format!("{}-emergency", CONSOLE_SINK_NAME))
    .with_console_output()
}

/// Rolling daily files in `config.folder`, mirrored to the console when
/// the console policy allows, delivered in the background
///
/// # Example
///
/// ```no_run
/// use rust_log_pipeline::compose::{rolling_file_pipeline, PipelineConfig};
/// use rust_log_pipeline::prelude::*;
///
/// let logger = rolling_file_pipeline(&PipelineConfig::default()).unwrap();
/// logger.error("payment service unreachable");
/// logger.dispose();
/// ```
pub fn rolling_file_pipeline(config: &PipelineConfig) -> Result<BackgroundDispatcher> {
    let files: Arc<dyn Sink> = Arc::new(SeverityFilter::new(
        Arc::new(RollingFileSink::new(&config.folder)?),
        config.min_level,
    ));

    if !config.console.participates() {
        return config.dispatcher("rolling-file", files).build();
    }

    let main = CompositeSink::builder()
        .name("console+rolling-file")
        .child(config.console())
        .child(files)
        .build()?;

    config
        .dispatcher("rolling-file", Arc::new(main))
        .emergency(Arc::new(console_emergency(config.min_level)))
        .diagnostic_records(true)
        .build()
}

/// Background fan-out to every sink in `children`
///
/// Records are not filtered here; wrap individual children in a
/// [`SeverityFilter`] for per-destination levels. When the console policy
/// allows, records the composite could not deliver are described on the
/// console.
///
/// # Errors
///
/// `InvalidConfiguration` when `children` is empty.
pub fn background_composite(
    children: Vec<Arc<dyn Sink>>,
    config: &PipelineConfig,
) -> Result<BackgroundDispatcher> {
    let main = CompositeSink::builder().children(children).build()?;
    let builder = config.dispatcher("composite", Arc::new(main));

    if config.console.participates() {
        builder
            .emergency(Arc::new(console_emergency(config.min_level)))
            .diagnostic_records(true)
            .build()
    } else {
        builder.build()
    }
}

/// Background delivery to `main` with a caller-chosen emergency sink
///
/// A console mirror is added when the console policy allows and the
/// emergency sink does not already write to the console.
pub fn with_emergency(
    main: Arc<dyn Sink>,
    emergency: Arc<dyn Sink>,
    config: &PipelineConfig,
) -> Result<BackgroundDispatcher> {
    let filtered: Arc<dyn Sink> = Arc::new(SeverityFilter::new(main, config.min_level));

    let main: Arc<dyn Sink> = if config.console.participates() && !is_console_sink(emergency.as_ref())
    {
        Arc::new(
            CompositeSink::builder()
                .name("console+main")
                .child(config.console())
                .child(filtered)
                .build()?,
        )
    } else {
        filtered
    };

    config
        .dispatcher("main", main)
        .emergency(emergency)
        .build()
}

/// Synchronously write a Critical record for `error` to the console and to
/// the file at `path`, then dispose both
///
/// # Errors
///
/// Returns the first delivery error; the other destination is still tried.
pub fn report_crash<E>(path: impl AsRef<Path>, message: &str, error: &E) -> Result<()>
where
    E: std::error::Error + ?Sized,
{
    let mut children: Vec<Arc<dyn Sink>> = vec![Arc::new(ConsoleSink::new())];
    let file_error = match FileSink::new(path.as_ref()) {
        Ok(file) => {
            children.push(Arc::new(file));
            None
        }
        Err(e) => Some(e),
    };

    let crash_log = CompositeSink::builder().name("crash").children(children).build()?;
    let record =
        LogRecord::new(LogLevel::Critical, message).with_exception(ExceptionInfo::from_error(error));
    let delivered = crash_log.log(&record);
    crash_log.dispose();

    match file_error {
        Some(e) => Err(e),
        None => delivered,
    }
}

/// Run a startup step, writing a crash report to `<folder>/crash.log` if
/// it fails; the step's error is handed back unchanged
pub fn run_reporting_crash<T, E, F>(folder: impl AsRef<Path>, step: F) -> std::result::Result<T, E>
where
    E: std::error::Error,
    F: FnOnce() -> std::result::Result<T, E>,
{
    step().map_err(|error| {
        let path = folder.as_ref().join(CRASH_LOG_FILE);
        if let Err(report_error) = report_crash(&path, CRASH_MESSAGE, &error) {
            crate::core::diagnostics::report(&report_error);
        }
        error
    })
}
