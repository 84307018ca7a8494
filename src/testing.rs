//! Test doubles for sinks
//!
//! Used by this crate's own tests and available to downstream crates that
//! want to assert on what their pipeline delivered.

use crate::core::{LogLevel, LogRecord, LoggerError, Result, Sink, SinkSwitch};
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Records everything it receives
pub struct SpySink {
    name: String,
    records: Mutex<Vec<LogRecord>>,
    log_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    dispose_calls: AtomicUsize,
    switch: SinkSwitch,
}

impl SpySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
            log_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            dispose_calls: AtomicUsize::new(0),
            switch: SinkSwitch::new(),
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.message().to_string())
            .collect()
    }

    pub fn levels(&self) -> Vec<LogLevel> {
        self.records.lock().iter().map(LogRecord::level).collect()
    }

    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn dispose_calls(&self) -> usize {
        self.dispose_calls.load(Ordering::SeqCst)
    }

    /// Poll until at least `n` records arrived; `false` on timeout
    pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.count() < n {
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Sink for SpySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().extend_from_slice(batch);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.switch.set_enabled(enabled);
    }

    fn dispose(&self) {
        self.dispose_calls.fetch_add(1, Ordering::SeqCst);
        self.switch.mark_disposed();
    }
}

enum FailMode {
    Always,
    /// 1-based `log` call numbers that fail
    OnCalls(HashSet<usize>),
    Panicking,
}

/// Fails (or panics) on demand; keeps the records it accepted
///
/// Only `log` is implemented, so batches go through the default per-record
/// path and report `PartialDelivery` with the failing indices.
pub struct FailingSink {
    name: String,
    mode: FailMode,
    log_calls: AtomicUsize,
    accepted: Mutex<Vec<LogRecord>>,
    dispose_calls: AtomicUsize,
    switch: SinkSwitch,
}

impl FailingSink {
    fn with_mode(name: impl Into<String>, mode: FailMode) -> Self {
        Self {
            name: name.into(),
            mode,
            log_calls: AtomicUsize::new(0),
            accepted: Mutex::new(Vec::new()),
            dispose_calls: AtomicUsize::new(0),
            switch: SinkSwitch::new(),
        }
    }

    pub fn always(name: impl Into<String>) -> Self {
        Self::with_mode(name, FailMode::Always)
    }

    /// Fail on the given 1-based `log` call numbers, accept the rest
    pub fn on_calls(name: impl Into<String>, calls: impl IntoIterator<Item = usize>) -> Self {
        Self::with_mode(name, FailMode::OnCalls(calls.into_iter().collect()))
    }

    /// Panic from `log` and `dispose`
    pub fn panicking(name: impl Into<String>) -> Self {
        Self::with_mode(name, FailMode::Panicking)
    }

    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    pub fn accepted(&self) -> Vec<LogRecord> {
        self.accepted.lock().clone()
    }

    pub fn accepted_messages(&self) -> Vec<String> {
        self.accepted
            .lock()
            .iter()
            .map(|r| r.message().to_string())
            .collect()
    }

    pub fn dispose_calls(&self) -> usize {
        self.dispose_calls.load(Ordering::SeqCst)
    }
}

impl Sink for FailingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }
        let call = self.log_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let fails = match &self.mode {
            FailMode::Always => true,
            FailMode::OnCalls(calls) => calls.contains(&call),
            FailMode::Panicking => panic!("{} panicked on call {}", self.name, call),
        };

        if fails {
            Err(LoggerError::delivery(&self.name, format!("injected failure on call {}", call)))
        } else {
            self.accepted.lock().push(record.clone());
            Ok(())
        }
    }

    fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.switch.set_enabled(enabled);
    }

    fn dispose(&self) {
        self.dispose_calls.fetch_add(1, Ordering::SeqCst);
        self.switch.mark_disposed();
        if matches!(self.mode, FailMode::Panicking) {
            panic!("{} panicked during dispose", self.name);
        }
    }
}

/// Blocks inside delivery until released
///
/// Simulates a destination that hangs, e.g. a stalled network write.
/// Disposing it also releases any blocked caller.
pub struct HangingSink {
    name: String,
    released: Mutex<bool>,
    wake: Condvar,
    entered: AtomicUsize,
    delivered: Mutex<Vec<LogRecord>>,
    switch: SinkSwitch,
}

impl HangingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            released: Mutex::new(false),
            wake: Condvar::new(),
            entered: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
            switch: SinkSwitch::new(),
        }
    }

    /// Let every blocked and future call through
    pub fn release(&self) {
        *self.released.lock() = true;
        self.wake.notify_all();
    }

    /// Number of calls that have entered delivery
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Poll until some call is blocked inside the sink
    pub fn wait_until_entered(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.entered() == 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    pub fn delivered_messages(&self) -> Vec<String> {
        self.delivered
            .lock()
            .iter()
            .map(|r| r.message().to_string())
            .collect()
    }

    fn block(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut released = self.released.lock();
        while !*released {
            self.wake.wait(&mut released);
        }
    }
}

impl Sink for HangingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        self.log_batch(std::slice::from_ref(record))
    }

    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }
        self.block();
        self.delivered.lock().extend_from_slice(batch);
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
        self.release();
    }
}
