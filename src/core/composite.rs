//! Fan-out to several sinks

use super::{
    diagnostics,
    error::{LoggerError, Result},
    log_record::LogRecord,
    sink::{dispose_guarded, guarded, Sink, SinkSwitch},
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Delivers every record to each enabled child, in order
///
/// Children are independent destinations: a failure or panic in one child
/// never stops delivery to the ones after it. Once all children have been
/// tried, their failures are combined and returned (unless `surface_errors`
/// is off): a partial failure names every record some child failed, and a
/// child failing the whole batch fails it for all. A
/// [`BackgroundDispatcher`](super::BackgroundDispatcher) wrapping the
/// composite can salvage the records to its emergency sink.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let composite = CompositeSink::builder()
///     .child(Arc::new(NullSink::new()))
///     .child(Arc::new(NullSink::new()))
///     .build()
///     .unwrap();
///
/// composite.info("goes to both");
/// ```
pub struct CompositeSink {
    name: String,
    children: Vec<Arc<dyn Sink>>,
    surface_errors: bool,
    switch: SinkSwitch,
}

impl CompositeSink {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when `children` is empty.
    pub fn new(children: Vec<Arc<dyn Sink>>) -> Result<Self> {
        Self::builder().children(children).build()
    }

    #[must_use]
    pub fn builder() -> CompositeSinkBuilder {
        CompositeSinkBuilder::new()
    }

    pub fn children(&self) -> &[Arc<dyn Sink>] {
        &self.children
    }

    fn deliver<F>(&self, mut call: F) -> Result<()>
    where
        F: FnMut(&dyn Sink) -> Result<()>,
    {
        let mut outcome = Outcome::default();

        for child in &self.children {
            if !child.is_enabled() {
                continue;
            }
            if let Err(e) = guarded(child.name(), || call(child.as_ref())) {
                diagnostics::report(&e);
                outcome.absorb(e);
            }
        }

        match outcome.into_error(&self.name) {
            Some(e) if self.surface_errors => Err(e),
            _ => Ok(()),
        }
    }
}

/// Failures collected across children
///
/// A record counts as failed when any child failed it. One child failing
/// the whole batch fails the whole batch, whatever the others report.
#[derive(Default)]
struct Outcome {
    first: Option<LoggerError>,
    failed: BTreeSet<usize>,
    whole: bool,
    errors: usize,
}

impl Outcome {
    fn absorb(&mut self, error: LoggerError) {
        match error.failed_indices() {
            Some(indices) => self.failed.extend(indices.iter().copied()),
            None => self.whole = true,
        }
        self.errors += 1;
        self.first.get_or_insert(error);
    }

    fn into_error(self, name: &str) -> Option<LoggerError> {
        let first = self.first?;
        if self.errors == 1 {
            return Some(first);
        }
        if self.whole {
            return Some(LoggerError::delivery(
                name,
                format!("{} child sink(s) failed, first: {}", self.errors, first),
            ));
        }
        let cause = match first {
            LoggerError::PartialDelivery { source, .. } => *source,
            other => other,
        };
        Some(LoggerError::partial(self.failed.into_iter().collect(), cause))
    }
}

impl Sink for CompositeSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }
        self.deliver(|child| child.log(record))
    }

    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        if !self.switch.is_open() || batch.is_empty() {
            return Ok(());
        }
        self.deliver(|child| child.log_batch(batch))
    }

    fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.switch.set_enabled(enabled);
    }

    fn dispose(&self) {
        if !self.switch.mark_disposed() {
            return;
        }
        for child in &self.children {
            dispose_guarded(child.as_ref());
        }
    }

    fn writes_to_console(&self) -> bool {
        self.children.iter().any(|child| child.writes_to_console())
    }
}

/// Builder for [`CompositeSink`]
pub struct CompositeSinkBuilder {
    name: String,
    children: Vec<Arc<dyn Sink>>,
    surface_errors: bool,
}

impl CompositeSinkBuilder {
    pub fn new() -> Self {
        Self {
            name: "composite".to_string(),
            children: Vec::new(),
            surface_errors: true,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn child(mut self, sink: Arc<dyn Sink>) -> Self {
        self.children.push(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn children(mut self, sinks: impl IntoIterator<Item = Arc<dyn Sink>>) -> Self {
        self.children.extend(sinks);
        self
    }

    /// Return the first child error to the caller (default `true`)
    #[must_use = "builder methods return a new value"]
    pub fn surface_errors(mut self, surface: bool) -> Self {
        self.surface_errors = surface;
        self
    }

    pub fn build(self) -> Result<CompositeSink> {
        if self.children.is_empty() {
            return Err(LoggerError::config("CompositeSink", "at least one child sink is required"));
        }
        Ok(CompositeSink {
            name: self.name,
            children: self.children,
            surface_errors: self.surface_errors,
            switch: SinkSwitch::new(),
        })
    }
}

impl Default for CompositeSinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
