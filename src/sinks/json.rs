//! JSON lines sink for structured logging

use super::file::{open_append, write_batch};
use crate::core::{diagnostics, LogRecord, LoggerError, Result, Sink, SinkSwitch};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes each record as a single-line JSON object (JSONL format)
///
/// Compatible with log aggregation tools that ingest one object per line.
pub struct JsonFileSink {
    name: String,
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    switch: SinkSwitch,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let writer = open_append(&path)?;

        Ok(Self {
            name: format!("json({})", path.display()),
            path,
            writer: Mutex::new(Some(writer)),
            switch: SinkSwitch::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for JsonFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        self.log_batch(std::slice::from_ref(record))
    }

    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        if !self.switch.is_open() || batch.is_empty() {
            return Ok(());
        }

        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| LoggerError::SinkDisposed(self.name.clone()))?;
        write_batch(writer, &self.path, batch, |record| Ok(record.to_json()?))
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
        if let Some(mut writer) = self.writer.lock().take() {
            if let Err(e) = writer.flush() {
                diagnostics::report(&LoggerError::from(e));
            }
        }
    }
}

impl Drop for JsonFileSink {
    fn drop(&mut self) {
        self.dispose();
    }
}
