//! Plain-text file sink

use super::format_text;
use crate::core::{
    diagnostics, sink::log_each, LogRecord, LoggerError, Result, Sink, SinkSwitch,
};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Open `path` for appending, creating it if needed
pub(crate) fn open_append(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggerError::io_operation("open", path.display().to_string(), e))?;
    Ok(BufWriter::new(file))
}

/// Write one line per record and flush once for the whole batch
pub(crate) fn write_batch<F>(
    writer: &mut BufWriter<File>,
    path: &Path,
    batch: &[LogRecord],
    mut render: F,
) -> Result<()>
where
    F: FnMut(&LogRecord) -> Result<String>,
{
    let written = log_each(batch, |record| {
        let line = render(record)?;
        writeln!(writer, "{}", line)
            .map_err(|e| LoggerError::io_operation("write", path.display().to_string(), e))
    });

    writer
        .flush()
        .map_err(|e| LoggerError::io_operation("flush", path.display().to_string(), e))?;
    written
}

/// Appends `[timestamp] [LEVEL] message` lines to a file
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    switch: SinkSwitch,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let writer = open_append(&path)?;

        Ok(Self {
            name: format!("file({})", path.display()),
            path,
            writer: Mutex::new(Some(writer)),
            switch: SinkSwitch::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
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
        let writer = match guard.as_mut() {
            Some(writer) => writer,
            None => return Err(LoggerError::SinkDisposed(self.name.clone())),
        };
        write_batch(writer, &self.path, batch, |record| Ok(format_text(record, true)))
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
                diagnostics::report(&LoggerError::io_operation(
                    "flush",
                    self.path.display().to_string(),
                    e,
                ));
            }
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogLevel, SinkExt};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_appends_lines() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("app.log");

        let sink = FileSink::new(&path)?;
        sink.info("first");
        sink.log_batch(&[
            LogRecord::new(LogLevel::Warning, "second"),
            LogRecord::new(LogLevel::Error, "third"),
        ])?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[INFO] first"));
        assert!(lines[2].ends_with("[ERROR] third"));
        Ok(())
    }

    #[test]
    fn test_dispose_flushes_and_stops() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("disposed.log");

        let sink = FileSink::new(&path)?;
        sink.critical("kept");
        sink.dispose();
        sink.critical("ignored");

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("kept"));
        assert!(!content.contains("ignored"));
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempdir().unwrap();
        let result = FileSink::new(dir.path().join("no/such/dir/app.log"));
        assert!(matches!(result, Err(LoggerError::IoOperation { .. })));
    }
}
