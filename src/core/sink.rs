//! Sink trait for log destinations and decorators

use super::{
    diagnostics,
    error::{LoggerError, Result},
    log_level::LogLevel,
    log_record::{ExceptionInfo, LogRecord},
};
use std::sync::atomic::{AtomicBool, Ordering};

/// A destination for log records
///
/// Leaf sinks write to a physical destination; decorators such as
/// [`CompositeSink`](super::CompositeSink) and
/// [`BackgroundDispatcher`](super::BackgroundDispatcher) hold other sinks.
/// Sinks are shared as `Arc<dyn Sink>`, so every method takes `&self`.
///
/// The returned `Result` is the delivery outcome. Callers that only want to
/// emit a record should go through [`SinkExt`], which ignores it.
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one record. A disabled or disposed sink returns `Ok(())`.
    fn log(&self, record: &LogRecord) -> Result<()>;

    /// Deliver records in order.
    ///
    /// The default writes each record through [`Sink::log`], keeps going past
    /// failures, and reports the failed indices as
    /// [`LoggerError::PartialDelivery`].
    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        log_each(batch, |record| self.log(record))
    }

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    /// Release resources. Idempotent.
    fn dispose(&self);

    /// Whether records handed to this sink can end up on the console.
    /// Decorators answer for the sinks they hold.
    fn writes_to_console(&self) -> bool {
        false
    }
}

/// Enabled/disposed gate shared by sink implementations
#[derive(Debug)]
pub struct SinkSwitch {
    enabled: AtomicBool,
    disposed: AtomicBool,
}

impl SinkSwitch {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
        }
    }

    /// True when records should be processed
    #[inline]
    pub fn is_open(&self) -> bool {
        self.is_enabled() && !self.is_disposed()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Flip to disposed. Returns `true` only for the first caller.
    pub fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }
}

impl Default for SinkSwitch {
    fn default() -> Self {
        Self::new()
    }
}

/// Write records one by one, collecting the indices that failed
pub(crate) fn log_each<F>(batch: &[LogRecord], mut write: F) -> Result<()>
where
    F: FnMut(&LogRecord) -> Result<()>,
{
    let mut failed = Vec::new();
    let mut first_error = None;

    for (idx, record) in batch.iter().enumerate() {
        if let Err(e) = write(record) {
            failed.push(idx);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        None => Ok(()),
        Some(e) => Err(LoggerError::partial(failed, e)),
    }
}

/// Run a sink call, turning a panic into [`LoggerError::SinkPanicked`]
pub(crate) fn guarded<F>(sink_name: &str, call: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(LoggerError::panicked(
            sink_name,
            diagnostics::panic_message(payload.as_ref()),
        )),
    }
}

/// Dispose a sink without letting a panic escape
pub(crate) fn dispose_guarded(sink: &dyn Sink) {
    if let Err(e) = guarded(sink.name(), || {
        sink.dispose();
        Ok(())
    }) {
        diagnostics::report(&e);
    }
}

/// Fire-and-forget helpers available on every sink
pub trait SinkExt: Sink {
    /// Build and deliver a record, ignoring the outcome
    fn write(&self, level: LogLevel, message: impl AsRef<str>) {
        let _ = self.log(&LogRecord::new(level, message));
    }

    fn debug(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Debug, message);
    }

    fn info(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Info, message);
    }

    fn warning(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Warning, message);
    }

    fn error(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Error, message);
    }

    fn critical(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Critical, message);
    }

    /// Log a critical record carrying an error
    fn critical_with<E>(&self, message: impl AsRef<str>, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let record = LogRecord::new(LogLevel::Critical, message)
            .with_exception(ExceptionInfo::from_error(error));
        let _ = self.log(&record);
    }

    /// Log an error record carrying an error
    fn error_with<E>(&self, message: impl AsRef<str>, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let record = LogRecord::new(LogLevel::Error, message)
            .with_exception(ExceptionInfo::from_error(error));
        let _ = self.log(&record);
    }
}

impl<S: Sink + ?Sized> SinkExt for S {}
