//! Sink built from closures

use super::{
    error::Result,
    log_record::LogRecord,
    sink::{log_each, Sink, SinkSwitch},
};

pub type RecordFn = Box<dyn Fn(&LogRecord) -> Result<()> + Send + Sync>;
pub type BatchFn = Box<dyn Fn(&[LogRecord]) -> Result<()> + Send + Sync>;

/// Adapts closures to the [`Sink`] contract
///
/// Handy for one-off behaviour such as an emergency sink that writes single
/// records to the console but ignores batch rewrites.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
///
/// let sink = LambdaSink::new(|record| {
///     eprintln!("{}", record.message());
///     Ok(())
/// })
/// .with_batch(|_batch| Ok(()));
///
/// sink.warning("disk almost full");
/// ```
pub struct LambdaSink {
    name: String,
    on_record: Option<RecordFn>,
    on_batch: Option<BatchFn>,
    console: bool,
    switch: SinkSwitch,
}

impl LambdaSink {
    /// A sink whose batches fall back to `on_record` per entry
    pub fn new<F>(on_record: F) -> Self
    where
        F: Fn(&LogRecord) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: "lambda".to_string(),
            on_record: Some(Box::new(on_record)),
            on_batch: None,
            console: false,
            switch: SinkSwitch::new(),
        }
    }

    /// A sink that only handles batches; single records arrive as a batch of one
    pub fn batch_only<F>(on_batch: F) -> Self
    where
        F: Fn(&[LogRecord]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: "lambda".to_string(),
            on_record: None,
            on_batch: Some(Box::new(on_batch)),
            console: false,
            switch: SinkSwitch::new(),
        }
    }

    #[must_use]
    pub fn with_batch<F>(mut self, on_batch: F) -> Self
    where
        F: Fn(&[LogRecord]) -> Result<()> + Send + Sync + 'static,
    {
        self.on_batch = Some(Box::new(on_batch));
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mark the closures as printing to the console
    #[must_use]
    pub fn with_console_output(mut self) -> Self {
        self.console = true;
        self
    }
}

impl Sink for LambdaSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }
        match (&self.on_record, &self.on_batch) {
            (Some(on_record), _) => on_record(record),
            (None, Some(on_batch)) => on_batch(std::slice::from_ref(record)),
            (None, None) => Ok(()),
        }
    }

    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        if !self.switch.is_open() || batch.is_empty() {
            return Ok(());
        }
        if let Some(on_batch) = &self.on_batch {
            return on_batch(batch);
        }
        log_each(batch, |record| self.log(record))
    }

    fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.switch.set_enabled(enabled);
    }

    fn dispose(&self) {
        self.switch.mark_disposed();
    }

    fn writes_to_console(&self) -> bool {
        self.console
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogLevel, LoggerError};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn records(n: usize) -> Vec<LogRecord> {
        (0..n)
            .map(|i| LogRecord::new(LogLevel::Error, format!("r{}", i)))
            .collect()
    }

    #[test]
    fn test_record_fn_used_for_batches_without_batch_fn() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = LambdaSink::new(move |r| {
            seen_clone.lock().push(r.message().to_string());
            Ok(())
        });

        sink.log_batch(&records(3)).unwrap();
        assert_eq!(*seen.lock(), vec!["r0", "r1", "r2"]);
    }

    #[test]
    fn test_batch_fn_overrides_per_record() {
        let singles = Arc::new(Mutex::new(0usize));
        let singles_clone = Arc::clone(&singles);
        let sink = LambdaSink::new(move |_| {
            *singles_clone.lock() += 1;
            Ok(())
        })
        .with_batch(|_| Ok(()));

        sink.log_batch(&records(4)).unwrap();
        assert_eq!(*singles.lock(), 0);

        sink.log(&records(1)[0]).unwrap();
        assert_eq!(*singles.lock(), 1);
    }

    #[test]
    fn test_batch_only_receives_single_as_batch() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sizes_clone = Arc::clone(&sizes);
        let sink = LambdaSink::batch_only(move |b| {
            sizes_clone.lock().push(b.len());
            Ok(())
        });

        sink.log(&records(1)[0]).unwrap();
        sink.log_batch(&records(3)).unwrap();
        assert_eq!(*sizes.lock(), vec![1, 3]);
    }

    #[test]
    fn test_partial_failure_indices() {
        let sink = LambdaSink::new(|r| {
            if r.message() == "r1" {
                Err(LoggerError::delivery("lambda", "rejected"))
            } else {
                Ok(())
            }
        });
        let err = sink.log_batch(&records(3)).unwrap_err();
        assert_eq!(err.failed_indices(), Some(&[1][..]));
    }

    #[test]
    fn test_disabled_is_noop() {
        let sink = LambdaSink::new(|_| Err(LoggerError::other("should not run")));
        sink.set_enabled(false);
        assert!(sink.log(&records(1)[0]).is_ok());
        sink.dispose();
        sink.dispose();
    }
}
