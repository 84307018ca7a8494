//! Daily rolling file sink

use super::{file::open_append, format_text};
use crate::core::{
    diagnostics, sink::log_each, LogRecord, LoggerError, Result, Sink, SinkSwitch,
};
use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

struct DailyFile {
    date: NaiveDate,
    writer: BufWriter<File>,
}

/// Writes into `<folder>/<YYYY-MM-DD>.log`, one file per local calendar day
///
/// The day is taken from each record's timestamp, so a batch straddling
/// midnight is split across both files.
///
/// # Example
///
/// ```no_run
/// use rust_log_pipeline::sinks::RollingFileSink;
///
/// let sink = RollingFileSink::new("Logs").unwrap();
/// ```
pub struct RollingFileSink {
    name: String,
    folder: PathBuf,
    current: Mutex<Option<DailyFile>>,
    switch: SinkSwitch,
}

impl RollingFileSink {
    /// # Errors
    ///
    /// Returns error if the folder cannot be created
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        fs::create_dir_all(&folder).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", folder.display()),
                e,
            )
        })?;

        Ok(Self {
            name: format!("rolling({})", folder.display()),
            folder,
            current: Mutex::new(None),
            switch: SinkSwitch::new(),
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// File a record dated `date` goes to
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.folder.join(format!("{}.log", date.format("%Y-%m-%d")))
    }

    /// Path of the file currently open, if any
    pub fn current_path(&self) -> Option<PathBuf> {
        self.current
            .lock()
            .as_ref()
            .map(|daily| self.path_for(daily.date))
    }

    fn writer_for<'a>(
        &self,
        current: &'a mut Option<DailyFile>,
        date: NaiveDate,
    ) -> Result<&'a mut BufWriter<File>> {
        let stale = current.as_ref().map_or(true, |daily| daily.date != date);
        if stale {
            if let Some(mut previous) = current.take() {
                if let Err(e) = previous.writer.flush() {
                    diagnostics::report(&LoggerError::io_operation(
                        "flush",
                        self.path_for(previous.date).display().to_string(),
                        e,
                    ));
                }
            }
            let writer = open_append(&self.path_for(date))?;
            *current = Some(DailyFile { date, writer });
        }

        match current.as_mut() {
            Some(daily) => Ok(&mut daily.writer),
            None => Err(LoggerError::other("rolling file writer missing after open")),
        }
    }
}

impl Sink for RollingFileSink {
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

        let mut current = self.current.lock();
        let written = log_each(batch, |record| {
            let date = record.timestamp().with_timezone(&Local).date_naive();
            let writer = self.writer_for(&mut current, date)?;
            writeln!(writer, "{}", format_text(record, true)).map_err(|e| {
                LoggerError::io_operation("write", self.path_for(date).display().to_string(), e)
            })
        });

        if let Some(daily) = current.as_mut() {
            daily.writer.flush().map_err(|e| {
                LoggerError::io_operation(
                    "flush",
                    self.path_for(daily.date).display().to_string(),
                    e,
                )
            })?;
        }
        written
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
        if let Some(mut daily) = self.current.lock().take() {
            if let Err(e) = daily.writer.flush() {
                diagnostics::report(&LoggerError::io_operation(
                    "flush",
                    self.path_for(daily.date).display().to_string(),
                    e,
                ));
            }
        }
    }
}

impl Drop for RollingFileSink {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn test_creates_folder_and_daily_file() -> Result<()> {
        let dir = tempdir()?;
        let folder = dir.path().join("Logs");

        let sink = RollingFileSink::new(&folder)?;
        assert!(folder.is_dir());

        let record = LogRecord::new(LogLevel::Error, "boom");
        let expected = sink.path_for(record.timestamp().with_timezone(&Local).date_naive());
        sink.log(&record)?;

        assert_eq!(sink.current_path(), Some(expected.clone()));
        let content = fs::read_to_string(&expected)?;
        assert!(content.contains("[ERROR] boom"));
        Ok(())
    }

    #[test]
    fn test_batch_split_across_days() -> Result<()> {
        let dir = tempdir()?;
        let sink = RollingFileSink::new(dir.path())?;

        let day_one = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let day_two = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        let batch = vec![
            LogRecord::new(LogLevel::Error, "first").with_timestamp(day_one),
            LogRecord::new(LogLevel::Error, "second").with_timestamp(day_two),
        ];
        sink.log_batch(&batch)?;
        sink.dispose();

        let first = sink.path_for(day_one.with_timezone(&Local).date_naive());
        let second = sink.path_for(day_two.with_timezone(&Local).date_naive());
        assert_ne!(first, second);
        assert!(fs::read_to_string(first)?.contains("first"));
        assert!(fs::read_to_string(second)?.contains("second"));
        Ok(())
    }

    #[test]
    fn test_file_name_layout() -> Result<()> {
        let dir = tempdir()?;
        let sink = RollingFileSink::new(dir.path())?;
        let date = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
        assert!(sink.path_for(date).ends_with("2023-11-05.log"));
        Ok(())
    }
}
