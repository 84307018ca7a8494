//! Sink that discards everything

use crate::core::{LogRecord, Result, Sink, SinkSwitch};

/// Accepts and discards records
///
/// Stands in when no logger is configured, e.g. an empty ambient slot.
#[derive(Default)]
pub struct NullSink {
    switch: SinkSwitch,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    fn log(&self, _record: &LogRecord) -> Result<()> {
        Ok(())
    }

    fn log_batch(&self, _batch: &[LogRecord]) -> Result<()> {
        Ok(())
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
}
