//! Console sink

use super::format_text;
use crate::core::{LogLevel, LogRecord, LoggerError, Result, Sink, SinkSwitch};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::Write;

/// Name every console sink reports; composition code uses it to tell
/// whether a sink already writes to the console
pub const CONSOLE_SINK_NAME: &str = "console";

/// Writes `[LEVEL] message` lines; Error and Critical go to stderr,
/// everything else to stdout
pub struct ConsoleSink {
    use_colors: bool,
    timestamps: bool,
    switch: SinkSwitch,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            use_colors: cfg!(feature = "console"),
            timestamps: false,
            switch: SinkSwitch::new(),
        }
    }

    /// Colors need the `console` feature; without it this is a no-op
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors && cfg!(feature = "console");
        self
    }

    #[must_use]
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn format(&self, record: &LogRecord) -> String {
        let line = format_text(record, self.timestamps);
        self.colorize(record.level(), line)
    }

    #[cfg(feature = "console")]
    fn colorize(&self, level: LogLevel, line: String) -> String {
        if self.use_colors {
            line.color(level.color_code()).to_string()
        } else {
            line
        }
    }

    #[cfg(not(feature = "console"))]
    fn colorize(&self, _level: LogLevel, line: String) -> String {
        line
    }

    fn write_lines<'a, I>(&self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = stdout.lock();
        let mut err = stderr.lock();

        for record in records {
            let line = self.format(record);
            let written = match record.level() {
                LogLevel::Error | LogLevel::Critical => writeln!(err, "{}", line),
                _ => writeln!(out, "{}", line),
            };
            written.map_err(|e| LoggerError::io_operation("write", CONSOLE_SINK_NAME, e))?;
        }

        out.flush()
            .and_then(|_| err.flush())
            .map_err(|e| LoggerError::io_operation("flush", CONSOLE_SINK_NAME, e))
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        CONSOLE_SINK_NAME
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }
        self.write_lines(std::iter::once(record))
    }

    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        if !self.switch.is_open() || batch.is_empty() {
            return Ok(());
        }
        self.write_lines(batch)
    }

    fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.switch.set_enabled(enabled);
    }

    fn dispose(&self) {
        if self.switch.mark_disposed() {
            let _ = std::io::stdout().flush();
        }
    }

    fn writes_to_console(&self) -> bool {
        true
    }
}
