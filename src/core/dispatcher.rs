//! Background dispatcher: queue records, deliver them on a worker thread

use super::{
    diagnostics,
    error::{LoggerError, Result},
    filter::{LevelVerifier, MinimumLevel},
    log_level::LogLevel,
    log_record::{ExceptionInfo, LogRecord},
    metrics::DispatcherMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    sink::{dispose_guarded, guarded, Sink, SinkSwitch},
};
use crossbeam_channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default bound on how long shutdown waits for the queue to drain (5 seconds)
///
/// Used when the dispatcher is disposed or dropped without an explicit
/// [`BackgroundDispatcher::shutdown`] timeout.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of records handed to the main sink per call
pub const DEFAULT_MAX_BATCH: usize = 64;

/// Default time the worker waits for more records before delivering a batch
pub const DEFAULT_LINGER: Duration = Duration::from_millis(10);

/// Callback invoked for every delivery failure the dispatcher observes
pub type FailureCallback = Arc<dyn Fn(&LoggerError) + Send + Sync>;

/// Observable lifecycle of a [`BackgroundDispatcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Nothing queued or in flight
    Idle,
    /// Records are waiting in the queue
    Queued,
    /// The worker is delivering a batch to the main sink
    Draining,
    /// The main sink failed; records are going to the emergency sink
    FaultedDelivering,
    /// Shut down; further records are ignored
    Disposed,
}

const PHASE_IDLE: u8 = 0;
const PHASE_DRAINING: u8 = 1;
const PHASE_FAULTED: u8 = 2;

/// Tuning knobs for a [`BackgroundDispatcher`]
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// `None` means an unbounded queue
    pub queue_capacity: Option<usize>,
    pub overflow_policy: OverflowPolicy,
    pub max_batch: usize,
    pub linger: Duration,
    pub shutdown_timeout: Duration,
    /// Also send a diagnostic record describing each main-sink failure to
    /// the emergency sink
    pub diagnostic_records: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: None,
            overflow_policy: OverflowPolicy::default(),
            max_batch: DEFAULT_MAX_BATCH,
            linger: DEFAULT_LINGER,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            diagnostic_records: false,
        }
    }
}

/// How often a blocked producer checks whether the dispatcher was disposed
const BLOCKED_SEND_POLL: Duration = Duration::from_millis(20);

enum Command {
    Record(LogRecord),
    Batch(Vec<LogRecord>),
    Flush(Sender<()>),
}

impl Command {
    fn into_records(self) -> Vec<LogRecord> {
        match self {
            Command::Record(record) => vec![record],
            Command::Batch(records) => records,
            Command::Flush(_) => Vec::new(),
        }
    }
}

/// Result of a send that may wait for queue space
enum Blocked {
    Sent,
    TimedOut,
    Closed(Command),
}

/// State shared between the producer side and the worker thread
struct Delivery {
    name: String,
    main: Arc<dyn Sink>,
    emergency: Option<Arc<dyn Sink>>,
    metrics: DispatcherMetrics,
    phase: AtomicU8,
    diagnostic_records: bool,
    on_failure: Option<FailureCallback>,
}

impl Delivery {
    fn set_phase(&self, phase: u8) {
        self.phase.store(phase, Ordering::Release);
    }

    fn notify(&self, error: &LoggerError) {
        diagnostics::report(error);
        if let Some(ref callback) = self.on_failure {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(error)));
        }
    }

    /// Hand one batch to the main sink, salvaging whatever it could not take
    fn deliver(&self, batch: Vec<LogRecord>) {
        if batch.is_empty() {
            return;
        }
        self.set_phase(PHASE_DRAINING);

        let total = batch.len();
        match guarded(self.main.name(), || self.main.log_batch(&batch)) {
            Ok(()) => {
                self.metrics.record_delivered(total as u64);
            }
            Err(error) => {
                self.set_phase(PHASE_FAULTED);
                self.metrics.record_failed_batch();

                let failed = match error.failed_indices() {
                    Some(indices) => {
                        let mut indices = indices.to_vec();
                        indices.sort_unstable();
                        indices.dedup();
                        indices.retain(|&i| i < total);
                        indices
                    }
                    None => (0..total).collect(),
                };
                self.metrics
                    .record_delivered((total - failed.len()) as u64);

                let salvage = if failed.len() == total {
                    batch
                } else {
                    failed.iter().map(|&i| batch[i].clone()).collect()
                };
                self.salvage(salvage, &error);
            }
        }

        self.set_phase(PHASE_IDLE);
    }

    /// Reroute records the main sink could not take
    fn salvage(&self, records: Vec<LogRecord>, cause: &LoggerError) {
        let count = records.len() as u64;
        self.notify(&LoggerError::delivery(
            self.main.name(),
            format!("{} record(s) not delivered: {}", count, cause),
        ));

        let emergency = match self.emergency {
            Some(ref emergency) => emergency,
            None => {
                self.metrics.record_lost(count);
                return;
            }
        };

        match guarded(emergency.name(), || emergency.log_batch(&records)) {
            Ok(()) => {
                self.metrics.record_rerouted(count);
            }
            Err(error) => {
                let lost = error
                    .failed_indices()
                    .map_or(count, |indices| indices.len().min(records.len()) as u64);
                self.metrics.record_rerouted(count - lost);
                self.metrics.record_lost(lost);
                self.notify(&LoggerError::fallback(
                    emergency.name(),
                    format!("{} record(s) lost: {}", lost, error),
                ));
            }
        }

        if self.diagnostic_records {
            let record = LogRecord::new(
                LogLevel::Error,
                format!(
                    "Background delivery to '{}' failed; {} record(s) rerouted",
                    self.main.name(),
                    count
                ),
            )
            .with_exception(ExceptionInfo::from_error(cause))
            .with_field("dispatcher", self.name.as_str())
            .with_field("sink", self.main.name())
            .with_field("rerouted", count as i64);

            if let Err(e) = guarded(emergency.name(), || emergency.log(&record)) {
                diagnostics::report(&e);
            }
        }
    }

    /// Worker loop: block for the first command, then gather a batch until
    /// `max_batch` records, the linger deadline, or a flush request
    fn run(&self, receiver: Receiver<Command>, max_batch: usize, linger: Duration) {
        let mut batch = Vec::with_capacity(max_batch);
        let mut waiters = Vec::new();

        loop {
            match receiver.recv() {
                Ok(command) => absorb(command, &mut batch, &mut waiters),
                // Closed and fully drained
                Err(_) => break,
            }

            let deadline = Instant::now() + linger;
            while batch.len() < max_batch && waiters.is_empty() {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                match receiver.recv_timeout(deadline - now) {
                    Ok(command) => absorb(command, &mut batch, &mut waiters),
                    Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            self.deliver(std::mem::take(&mut batch));
            for waiter in waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

fn absorb(command: Command, batch: &mut Vec<LogRecord>, waiters: &mut Vec<Sender<()>>) {
    match command {
        Command::Record(record) => batch.push(record),
        Command::Batch(records) => batch.extend(records),
        Command::Flush(ack) => waiters.push(ack),
    }
}

/// Asynchronous decorator around a main sink
///
/// `log` and `log_batch` only enqueue and return immediately. A dedicated
/// worker thread drains the queue in FIFO order and hands batches to the
/// main sink. Records the main sink rejects (by error or panic) go to the
/// emergency sink; a failure there is reported through
/// [`diagnostics`](super::diagnostics) and counted as lost, never raised to
/// the producer.
///
/// Dropping the dispatcher shuts it down with its configured timeout.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let dispatcher = BackgroundDispatcher::builder(Arc::new(NullSink::new()))
///     .emergency(Arc::new(NullSink::new()))
///     .min_level(LogLevel::Warning)
///     .build()
///     .unwrap();
///
/// dispatcher.error("written on the worker thread");
/// assert!(dispatcher.flush(std::time::Duration::from_secs(1)));
/// dispatcher.dispose();
/// ```
pub struct BackgroundDispatcher {
    delivery: Arc<Delivery>,
    sender: RwLock<Option<Sender<Command>>>,
    /// Kept to salvage the queue tail if the worker misses the shutdown deadline
    receiver: Receiver<Command>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    threshold: Option<MinimumLevel>,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    shutdown_timeout: Duration,
    switch: SinkSwitch,
}

impl BackgroundDispatcher {
    /// Dispatcher with default settings and no emergency sink
    pub fn new(main: Arc<dyn Sink>) -> Result<Self> {
        Self::builder(main).build()
    }

    #[must_use]
    pub fn builder(main: Arc<dyn Sink>) -> DispatcherBuilder {
        DispatcherBuilder::new(main)
    }

    pub fn state(&self) -> DispatcherState {
        if self.switch.is_disposed() {
            return DispatcherState::Disposed;
        }
        match self.delivery.phase.load(Ordering::Acquire) {
            PHASE_DRAINING => DispatcherState::Draining,
            PHASE_FAULTED => DispatcherState::FaultedDelivering,
            _ if self.delivery.metrics.pending() > 0 => DispatcherState::Queued,
            _ => DispatcherState::Idle,
        }
    }

    pub fn metrics(&self) -> &DispatcherMetrics {
        &self.delivery.metrics
    }

    pub fn main_sink(&self) -> &Arc<dyn Sink> {
        &self.delivery.main
    }

    pub fn emergency_sink(&self) -> Option<&Arc<dyn Sink>> {
        self.delivery.emergency.as_ref()
    }

    /// Wait until everything queued before this call has been handled
    ///
    /// Returns `false` if the worker did not get there within `timeout`.
    pub fn flush(&self, timeout: Duration) -> bool {
        let (ack, done) = bounded(1);
        let sender = match self.sender() {
            Some(sender) => sender,
            None => return self.delivery.metrics.pending() == 0,
        };
        if sender.send_timeout(Command::Flush(ack), timeout).is_err() {
            return false;
        }
        drop(sender);
        done.recv_timeout(timeout).is_ok()
    }

    /// Stop accepting records, drain the queue, then dispose both sinks
    ///
    /// Waits at most `timeout` for the worker. On timeout the records still
    /// queued are handed to the emergency sink, a
    /// [`LoggerError::ShutdownTimeout`] is reported, and `false` is returned.
    /// Calling it again after the first time returns `true` immediately.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        if !self.switch.mark_disposed() {
            return true;
        }

        // Closing the channel lets the worker exit once the queue is empty
        drop(self.sender.write().take());

        let mut completed = true;
        if let Some(handle) = self.worker.lock().take() {
            let start = Instant::now();

            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        diagnostics::report(&LoggerError::panicked(
                            &self.delivery.name,
                            diagnostics::panic_message(e.as_ref()),
                        ));
                        completed = false;
                    }
                    break;
                }

                if start.elapsed() >= timeout {
                    completed = false;
                    self.abandon_worker(timeout);
                    break;
                }

                thread::sleep(Duration::from_millis(10));
            }
        }

        if completed {
            dispose_guarded(self.delivery.main.as_ref());
        } else {
            // The worker may still be stuck inside the main sink; release it
            // off this thread so shutdown stays bounded
            let main = Arc::clone(&self.delivery.main);
            let spawned = thread::Builder::new()
                .name(format!("log-dispatcher-{}-dispose", self.delivery.name))
                .spawn(move || dispose_guarded(main.as_ref()));
            if let Err(e) = spawned {
                diagnostics::report(&LoggerError::io_operation(
                    "spawn dispose thread",
                    &self.delivery.name,
                    e,
                ));
            }
        }

        if let Some(ref emergency) = self.delivery.emergency {
            dispose_guarded(emergency.as_ref());
        }

        completed
    }

    /// Salvage what the stuck worker never picked up
    fn abandon_worker(&self, timeout: Duration) {
        let mut leftovers = Vec::new();
        let mut waiters = Vec::new();
        while let Ok(command) = self.receiver.try_recv() {
            absorb(command, &mut leftovers, &mut waiters);
        }

        let error = LoggerError::shutdown_timeout(
            &self.delivery.name,
            timeout,
            self.delivery.metrics.pending(),
        );
        self.delivery.notify(&error);

        if !leftovers.is_empty() {
            self.delivery.salvage(leftovers, &error);
        }
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    /// A clone of the sender, so no lock is held while a producer waits
    fn sender(&self) -> Option<Sender<Command>> {
        self.sender.read().clone()
    }

    fn enqueue(&self, command: Command, count: u64, level: LogLevel) {
        let sender = match self.sender() {
            Some(sender) => sender,
            None => return,
        };

        // Count first so `pending` never undercounts while the worker runs
        self.delivery.metrics.record_enqueued(count);

        match sender.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                self.handle_overflow(&sender, command, count, level);
            }
            Err(TrySendError::Disconnected(command)) => self.reroute_closed(command),
        }
    }

    /// Apply the overflow policy; Error and Critical records always wait
    fn handle_overflow(&self, sender: &Sender<Command>, command: Command, count: u64, level: LogLevel) {
        let metrics = &self.delivery.metrics;
        metrics.record_queue_full();

        let deadline = match self.overflow_policy {
            _ if level >= LogLevel::Error => None,
            OverflowPolicy::Block => None,
            OverflowPolicy::BlockWithTimeout(timeout) => Some(Instant::now() + timeout),
            OverflowPolicy::DropNewest => {
                for _ in 0..count {
                    metrics.record_dropped();
                }
                return;
            }
            OverflowPolicy::AlertAndDrop => {
                self.alert_and_drop(count);
                return;
            }
        };

        metrics.record_block();
        match self.send_blocking(sender, command, deadline) {
            Blocked::Sent => {}
            Blocked::TimedOut => self.alert_and_drop(count),
            Blocked::Closed(command) => self.reroute_closed(command),
        }
    }

    /// Wait for queue space until `deadline`, giving up once disposed
    fn send_blocking(
        &self,
        sender: &Sender<Command>,
        mut command: Command,
        deadline: Option<Instant>,
    ) -> Blocked {
        loop {
            if self.switch.is_disposed() {
                return Blocked::Closed(command);
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Blocked::TimedOut;
                    }
                    (deadline - now).min(BLOCKED_SEND_POLL)
                }
                None => BLOCKED_SEND_POLL,
            };

            match sender.send_timeout(command, wait) {
                Ok(()) => return Blocked::Sent,
                Err(SendTimeoutError::Timeout(returned)) => command = returned,
                Err(SendTimeoutError::Disconnected(returned)) => return Blocked::Closed(returned),
            }
        }
    }

    /// Records accepted before dispose that never made it into the queue
    fn reroute_closed(&self, command: Command) {
        let records = command.into_records();
        if records.is_empty() {
            return;
        }
        let cause = LoggerError::SinkDisposed(self.delivery.name.clone());
        self.delivery.salvage(records, &cause);
    }

    fn alert_and_drop(&self, count: u64) {
        for _ in 0..count {
            let dropped = self.delivery.metrics.record_dropped() + 1;

            // Alert on first drop and periodically thereafter
            if dropped == 1 || dropped % 1000 == 0 {
                diagnostics::report(&LoggerError::queue_overflow(dropped));
                if let Some(ref callback) = self.on_overflow {
                    callback(dropped);
                }
            }
        }
    }

    fn accepts(&self, level: LogLevel) -> bool {
        self.threshold
            .as_ref()
            .map_or(true, |threshold| threshold.verify(level))
    }
}

impl Sink for BackgroundDispatcher {
    fn name(&self) -> &str {
        &self.delivery.name
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.switch.is_open() || !self.accepts(record.level()) {
            return Ok(());
        }
        self.enqueue(Command::Record(record.clone()), 1, record.level());
        Ok(())
    }

    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }

        let accepted: Vec<LogRecord> = batch
            .iter()
            .filter(|record| self.accepts(record.level()))
            .cloned()
            .collect();
        if accepted.is_empty() {
            return Ok(());
        }

        let count = accepted.len() as u64;
        let most_severe = accepted
            .iter()
            .map(LogRecord::level)
            .max()
            .unwrap_or_default();
        self.enqueue(Command::Batch(accepted), count, most_severe);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.switch.set_enabled(enabled);
    }

    fn dispose(&self) {
        self.shutdown(self.shutdown_timeout);
    }

    /// True when either the main or the emergency sink reaches the console
    fn writes_to_console(&self) -> bool {
        self.delivery.main.writes_to_console()
            || self
                .delivery
                .emergency
                .as_ref()
                .is_some_and(|emergency| emergency.writes_to_console())
    }
}

impl Drop for BackgroundDispatcher {
    fn drop(&mut self) {
        self.shutdown(self.shutdown_timeout);
    }
}

/// Builder for [`BackgroundDispatcher`]
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let dispatcher = BackgroundDispatcher::builder(Arc::new(NullSink::new()))
///     .name("app")
///     .queue_capacity(1024)
///     .overflow_policy(OverflowPolicy::Block)
///     .shutdown_timeout(Duration::from_secs(2))
///     .build()
///     .unwrap();
///
/// assert_eq!(dispatcher.name(), "app");
/// ```
pub struct DispatcherBuilder {
    name: String,
    main: Arc<dyn Sink>,
    emergency: Option<Arc<dyn Sink>>,
    min_level: Option<LogLevel>,
    config: DispatcherConfig,
    on_overflow: Option<OverflowCallback>,
    on_failure: Option<FailureCallback>,
}

impl DispatcherBuilder {
    pub fn new(main: Arc<dyn Sink>) -> Self {
        Self {
            name: "background".to_string(),
            main,
            emergency: None,
            min_level: None,
            config: DispatcherConfig::default(),
            on_overflow: None,
            on_failure: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sink that receives records the main sink rejected
    #[must_use = "builder methods return a new value"]
    pub fn emergency(mut self, sink: Arc<dyn Sink>) -> Self {
        self.emergency = Some(sink);
        self
    }

    /// Drop records below `level` before they are queued
    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound the queue; without this it is unbounded
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// Only applies to a bounded queue
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_batch(mut self, max_batch: usize) -> Self {
        self.config.max_batch = max_batch;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn linger(mut self, linger: Duration) -> Self {
        self.config.linger = linger;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn diagnostic_records(mut self, enabled: bool) -> Self {
        self.config.diagnostic_records = enabled;
        self
    }

    /// Called with the running total each time records are dropped on overflow
    ///
    /// # Example
    ///
    /// ```
    /// use rust_log_pipeline::prelude::*;
    /// use std::sync::Arc;
    ///
    /// let dispatcher = BackgroundDispatcher::builder(Arc::new(NullSink::new()))
    ///     .queue_capacity(8)
    ///     .on_overflow(Arc::new(|count| {
    ///         eprintln!("Warning: {} records dropped", count);
    ///     }))
    ///     .build()
    ///     .unwrap();
    /// # drop(dispatcher);
    /// ```
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Called for every delivery failure, in addition to the global diagnostics hook
    #[must_use = "builder methods return a new value"]
    pub fn on_failure(mut self, callback: FailureCallback) -> Self {
        self.on_failure = Some(callback);
        self
    }

    /// Start the worker thread
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a zero `max_batch` or zero queue capacity,
    /// `IoOperation` if the worker thread cannot be spawned.
    pub fn build(self) -> Result<BackgroundDispatcher> {
        let config = self.config;
        if config.max_batch == 0 {
            return Err(LoggerError::config("BackgroundDispatcher", "max_batch must be at least 1"));
        }
        if config.queue_capacity == Some(0) {
            return Err(LoggerError::config(
                "BackgroundDispatcher",
                "queue_capacity must be at least 1",
            ));
        }

        let (sender, receiver) = match config.queue_capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };

        let delivery = Arc::new(Delivery {
            name: self.name,
            main: self.main,
            emergency: self.emergency,
            metrics: DispatcherMetrics::new(),
            phase: AtomicU8::new(PHASE_IDLE),
            diagnostic_records: config.diagnostic_records,
            on_failure: self.on_failure,
        });

        let worker_delivery = Arc::clone(&delivery);
        let worker_receiver = receiver.clone();
        let (max_batch, linger) = (config.max_batch, config.linger);
        let handle = thread::Builder::new()
            .name(format!("log-dispatcher-{}", delivery.name))
            .spawn(move || worker_delivery.run(worker_receiver, max_batch, linger))
            .map_err(|e| LoggerError::io_operation("spawn worker thread", &delivery.name, e))?;

        Ok(BackgroundDispatcher {
            delivery,
            sender: RwLock::new(Some(sender)),
            receiver,
            worker: Mutex::new(Some(handle)),
            threshold: self.min_level.map(MinimumLevel),
            overflow_policy: config.overflow_policy,
            on_overflow: self.on_overflow,
            shutdown_timeout: config.shutdown_timeout,
            switch: SinkSwitch::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SinkExt;
    use crate::testing::{FailingSink, HangingSink, SpySink};
    use std::sync::atomic::AtomicU64;

    fn spy(name: &str) -> Arc<SpySink> {
        Arc::new(SpySink::new(name))
    }

    #[test]
    fn test_builder_rejects_zero_batch() {
        let result = BackgroundDispatcher::builder(spy("main")).max_batch(0).build();
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_records_delivered_in_order() {
        let main = spy("main");
        let dispatcher = BackgroundDispatcher::new(main.clone()).unwrap();

        for i in 0..100 {
            dispatcher.info(format!("m{}", i));
        }
        assert!(dispatcher.flush(Duration::from_secs(5)));

        let expected: Vec<String> = (0..100).map(|i| format!("m{}", i)).collect();
        assert_eq!(main.messages(), expected);
        assert_eq!(dispatcher.metrics().delivered_count(), 100);
        assert_eq!(dispatcher.state(), DispatcherState::Idle);
    }

    #[test]
    fn test_threshold_applied_before_queue() {
        let main = spy("main");
        let dispatcher = BackgroundDispatcher::builder(main.clone())
            .min_level(LogLevel::Warning)
            .build()
            .unwrap();

        dispatcher.debug("dropped");
        dispatcher.info("dropped");
        dispatcher.warning("kept");
        dispatcher.dispose();

        assert_eq!(dispatcher.metrics().enqueued_count(), 1);
        assert_eq!(main.messages(), vec!["kept"]);
    }

    #[test]
    fn test_failed_record_goes_to_emergency() {
        let main = Arc::new(FailingSink::on_calls("main", [2]));
        let emergency = spy("emergency");
        let dispatcher = BackgroundDispatcher::builder(main.clone())
            .emergency(emergency.clone())
            .build()
            .unwrap();

        dispatcher.info("a");
        dispatcher.info("b");
        dispatcher.info("c");
        dispatcher.dispose();

        assert_eq!(main.log_calls(), 3);
        assert_eq!(emergency.messages(), vec!["b"]);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.delivered_count(), 2);
        assert_eq!(metrics.rerouted_count(), 1);
        assert_eq!(metrics.lost_count(), 0);
    }

    #[test]
    fn test_panicking_main_salvaged() {
        let emergency = spy("emergency");
        let dispatcher = BackgroundDispatcher::builder(Arc::new(FailingSink::panicking("main")))
            .emergency(emergency.clone())
            .build()
            .unwrap();

        dispatcher.error("survives");
        dispatcher.dispose();

        assert_eq!(emergency.messages(), vec!["survives"]);
    }

    #[test]
    fn test_emergency_failure_counted_as_lost() {
        let failures = Arc::new(AtomicU64::new(0));
        let failures_clone = Arc::clone(&failures);
        let dispatcher = BackgroundDispatcher::builder(Arc::new(FailingSink::always("main")))
            .emergency(Arc::new(FailingSink::always("emergency")))
            .on_failure(Arc::new(move |e| {
                if e.is_loss() {
                    failures_clone.fetch_add(1, Ordering::SeqCst);
                }
            }))
            .build()
            .unwrap();

        dispatcher.critical("nowhere to go");
        dispatcher.dispose();

        assert_eq!(dispatcher.metrics().lost_count(), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_diagnostic_record_sent_when_enabled() {
        let emergency = spy("emergency");
        let dispatcher = BackgroundDispatcher::builder(Arc::new(FailingSink::always("main")))
            .emergency(emergency.clone())
            .diagnostic_records(true)
            .build()
            .unwrap();

        dispatcher.warning("w");
        dispatcher.dispose();

        let records = emergency.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message(), "w");
        assert_eq!(records[1].level(), LogLevel::Error);
        assert!(records[1].exception().is_some());
    }

    #[test]
    fn test_dispose_is_idempotent_and_silences() {
        let main = spy("main");
        let emergency = spy("emergency");
        let dispatcher = BackgroundDispatcher::builder(main.clone())
            .emergency(emergency.clone())
            .build()
            .unwrap();

        dispatcher.info("before");
        dispatcher.dispose();
        dispatcher.dispose();
        dispatcher.info("after");

        assert_eq!(dispatcher.state(), DispatcherState::Disposed);
        assert_eq!(main.messages(), vec!["before"]);
        assert_eq!(main.dispose_calls(), 1);
        assert_eq!(emergency.dispose_calls(), 1);
    }

    #[test]
    fn test_shutdown_timeout_salvages_queue() {
        let main = Arc::new(HangingSink::new("main"));
        let emergency = spy("emergency");
        let dispatcher = BackgroundDispatcher::builder(main.clone())
            .emergency(emergency.clone())
            .max_batch(1)
            .build()
            .unwrap();

        dispatcher.info("stuck");
        assert!(main.wait_until_entered(Duration::from_secs(5)));
        dispatcher.info("queued");

        let start = Instant::now();
        assert!(!dispatcher.shutdown(Duration::from_millis(100)));
        assert!(start.elapsed() < Duration::from_secs(5));

        assert_eq!(emergency.messages(), vec!["queued"]);
        main.release();
    }

    #[test]
    fn test_shutdown_not_held_up_by_blocked_producer() {
        let main = Arc::new(HangingSink::new("main"));
        let emergency = spy("emergency");
        let dispatcher = Arc::new(
            BackgroundDispatcher::builder(main.clone())
                .emergency(emergency.clone())
                .queue_capacity(1)
                .max_batch(1)
                .build()
                .unwrap(),
        );

        dispatcher.error("in flight");
        assert!(main.wait_until_entered(Duration::from_secs(5)));
        dispatcher.error("queued");

        let producer = {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || dispatcher.error("blocked"))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());

        let start = Instant::now();
        assert!(!dispatcher.shutdown(Duration::from_millis(100)));
        assert!(start.elapsed() < Duration::from_secs(2));
        producer.join().expect("Producer thread panicked");

        let mut rerouted = emergency.messages();
        rerouted.sort();
        assert_eq!(rerouted, vec!["blocked", "queued"]);
        assert_eq!(dispatcher.metrics().lost_count(), 0);
    }

    #[test]
    fn test_overflow_drop_newest() {
        let main = Arc::new(HangingSink::new("main"));
        let dispatcher = BackgroundDispatcher::builder(main.clone())
            .queue_capacity(1)
            .max_batch(1)
            .overflow_policy(OverflowPolicy::DropNewest)
            .build()
            .unwrap();

        dispatcher.info("in flight");
        assert!(main.wait_until_entered(Duration::from_secs(5)));
        dispatcher.info("queued");
        dispatcher.info("dropped");

        assert_eq!(dispatcher.metrics().dropped_count(), 1);
        assert_eq!(dispatcher.metrics().queue_full_events(), 1);

        main.release();
        dispatcher.dispose();
    }

    #[test]
    fn test_overflow_callback_invoked() {
        let main = Arc::new(HangingSink::new("main"));
        let alerted = Arc::new(AtomicU64::new(0));
        let alerted_clone = Arc::clone(&alerted);
        let dispatcher = BackgroundDispatcher::builder(main.clone())
            .queue_capacity(1)
            .max_batch(1)
            .on_overflow(Arc::new(move |count| {
                alerted_clone.store(count, Ordering::SeqCst);
            }))
            .build()
            .unwrap();

        dispatcher.info("in flight");
        assert!(main.wait_until_entered(Duration::from_secs(5)));
        dispatcher.info("queued");
        dispatcher.info("dropped");

        assert_eq!(alerted.load(Ordering::SeqCst), 1);

        main.release();
        dispatcher.dispose();
    }

    #[test]
    fn test_batch_submission_kept_together() {
        let main = spy("main");
        let dispatcher = BackgroundDispatcher::new(main.clone()).unwrap();

        let batch: Vec<_> = (0..3)
            .map(|i| LogRecord::new(LogLevel::Info, format!("b{}", i)))
            .collect();
        dispatcher.log_batch(&batch).unwrap();
        assert!(dispatcher.flush(Duration::from_secs(5)));

        assert_eq!(main.messages(), vec!["b0", "b1", "b2"]);
        assert!(main.batch_calls() >= 1);
    }
}
