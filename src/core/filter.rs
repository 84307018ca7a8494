//! Severity filter decorator

use super::{
    error::{LoggerError, Result},
    log_level::LogLevel,
    log_record::LogRecord,
    sink::{dispose_guarded, Sink, SinkSwitch},
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Decides whether a level passes
pub trait LevelVerifier: Send + Sync {
    fn verify(&self, level: LogLevel) -> bool;
}

impl<F> LevelVerifier for F
where
    F: Fn(LogLevel) -> bool + Send + Sync,
{
    fn verify(&self, level: LogLevel) -> bool {
        self(level)
    }
}

/// Passes levels at or above a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumLevel(pub LogLevel);

impl LevelVerifier for MinimumLevel {
    fn verify(&self, level: LogLevel) -> bool {
        level >= self.0
    }
}

/// Passes levels inside an inclusive range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRange {
    pub min: LogLevel,
    pub max: LogLevel,
}

impl LevelVerifier for LevelRange {
    fn verify(&self, level: LogLevel) -> bool {
        level >= self.min && level <= self.max
    }
}

/// Drops records the verifier rejects before they reach the target
///
/// The decision depends only on the record's level and the configured
/// verifier, so a filter placed in front of a
/// [`BackgroundDispatcher`](super::BackgroundDispatcher) keeps rejected
/// records out of its queue entirely.
pub struct SeverityFilter {
    name: String,
    target: Arc<dyn Sink>,
    verifier: RwLock<Arc<dyn LevelVerifier>>,
    switch: SinkSwitch,
}

impl SeverityFilter {
    pub fn new(target: Arc<dyn Sink>, min_level: LogLevel) -> Self {
        Self::with_verifier(target, MinimumLevel(min_level))
    }

    pub fn with_verifier<V: LevelVerifier + 'static>(target: Arc<dyn Sink>, verifier: V) -> Self {
        Self {
            name: format!("filter({})", target.name()),
            target,
            verifier: RwLock::new(Arc::new(verifier)),
            switch: SinkSwitch::new(),
        }
    }

    /// Swap the threshold; later records see the new value
    pub fn set_min_level(&self, level: LogLevel) {
        self.set_verifier(MinimumLevel(level));
    }

    pub fn set_verifier<V: LevelVerifier + 'static>(&self, verifier: V) {
        *self.verifier.write() = Arc::new(verifier);
    }

    #[inline]
    pub fn passes(&self, level: LogLevel) -> bool {
        self.verifier.read().verify(level)
    }

    pub fn target(&self) -> &Arc<dyn Sink> {
        &self.target
    }
}

impl Sink for SeverityFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.switch.is_open() || !self.passes(record.level()) {
            return Ok(());
        }
        self.target.log(record)
    }

    fn log_batch(&self, batch: &[LogRecord]) -> Result<()> {
        if !self.switch.is_open() {
            return Ok(());
        }

        let verifier = self.verifier.read().clone();
        let kept: Vec<usize> = batch
            .iter()
            .enumerate()
            .filter(|(_, r)| verifier.verify(r.level()))
            .map(|(idx, _)| idx)
            .collect();

        if kept.is_empty() {
            return Ok(());
        }
        if kept.len() == batch.len() {
            return self.target.log_batch(batch);
        }

        let forwarded: Vec<LogRecord> = kept.iter().map(|&idx| batch[idx].clone()).collect();
        match self.target.log_batch(&forwarded) {
            Ok(()) => Ok(()),
            Err(LoggerError::PartialDelivery { failed, source }) => {
                // failed indices refer to `forwarded`; map back to `batch`
                // and drop any the target made up
                let failed = failed
                    .into_iter()
                    .filter_map(|idx| kept.get(idx).copied())
                    .collect();
                Err(LoggerError::PartialDelivery { failed, source })
            }
            // Only the forwarded records failed, not the filtered ones
            Err(e) => Err(LoggerError::partial(kept, e)),
        }
    }

    fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.switch.set_enabled(enabled);
    }

    fn dispose(&self) {
        if self.switch.mark_disposed() {
            dispose_guarded(self.target.as_ref());
        }
    }

    fn writes_to_console(&self) -> bool {
        self.target.writes_to_console()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LambdaSink;
    use crate::testing::{FailingSink, SpySink};

    fn at(level: LogLevel) -> LogRecord {
        LogRecord::new(level, format!("{}", level))
    }

    #[test]
    fn test_drops_below_threshold() {
        let spy = Arc::new(SpySink::new("spy"));
        let filter = SeverityFilter::new(spy.clone(), LogLevel::Warning);

        for level in LogLevel::ALL {
            filter.log(&at(level)).unwrap();
        }

        assert_eq!(
            spy.levels(),
            vec![LogLevel::Warning, LogLevel::Error, LogLevel::Critical]
        );
    }

    #[test]
    fn test_batch_forwards_only_passing() {
        let spy = Arc::new(SpySink::new("spy"));
        let filter = SeverityFilter::new(spy.clone(), LogLevel::Error);

        let batch: Vec<_> = LogLevel::ALL.iter().map(|&l| at(l)).collect();
        filter.log_batch(&batch).unwrap();

        assert_eq!(spy.levels(), vec![LogLevel::Error, LogLevel::Critical]);
        assert_eq!(spy.batch_calls(), 1);
    }

    #[test]
    fn test_batch_all_filtered_skips_target() {
        let spy = Arc::new(SpySink::new("spy"));
        let filter = SeverityFilter::new(spy.clone(), LogLevel::Critical);

        filter
            .log_batch(&[at(LogLevel::Debug), at(LogLevel::Info)])
            .unwrap();
        assert_eq!(spy.batch_calls(), 0);
        assert_eq!(spy.count(), 0);
    }

    #[test]
    fn test_partial_indices_remapped() {
        // target fails its 2nd record, which is batch index 3 after filtering
        let failing = Arc::new(FailingSink::on_calls("failing", [2]));
        let filter = SeverityFilter::new(failing.clone(), LogLevel::Warning);

        let batch = vec![
            at(LogLevel::Debug),
            at(LogLevel::Error),
            at(LogLevel::Info),
            at(LogLevel::Critical),
        ];
        let err = filter.log_batch(&batch).unwrap_err();
        assert_eq!(err.failed_indices(), Some(&[3][..]));
    }

    #[test]
    fn test_unknown_target_indices_dropped() {
        let target = Arc::new(LambdaSink::batch_only(|_batch| {
            Err(LoggerError::partial(vec![0, 9], LoggerError::other("bad index")))
        }));
        let filter = SeverityFilter::new(target, LogLevel::Error);

        let batch = vec![at(LogLevel::Info), at(LogLevel::Error)];
        let err = filter.log_batch(&batch).unwrap_err();
        assert_eq!(err.failed_indices(), Some(&[1][..]));
    }

    #[test]
    fn test_whole_target_failure_names_only_forwarded() {
        let failing = Arc::new(FailingSink::always("failing"));
        let target = Arc::new(LambdaSink::batch_only(move |_batch| {
            failing.log(&LogRecord::new(LogLevel::Error, "whole batch"))
        }));
        let filter = SeverityFilter::new(target, LogLevel::Warning);

        let batch = vec![
            at(LogLevel::Warning),
            at(LogLevel::Debug),
            at(LogLevel::Critical),
        ];
        let err = filter.log_batch(&batch).unwrap_err();
        assert_eq!(err.failed_indices(), Some(&[0, 2][..]));
    }

    #[test]
    fn test_runtime_threshold_change() {
        let spy = Arc::new(SpySink::new("spy"));
        let filter = SeverityFilter::new(spy.clone(), LogLevel::Error);

        filter.log(&at(LogLevel::Info)).unwrap();
        filter.set_min_level(LogLevel::Debug);
        filter.log(&at(LogLevel::Info)).unwrap();

        assert_eq!(spy.count(), 1);
    }

    #[test]
    fn test_range_verifier() {
        let spy = Arc::new(SpySink::new("spy"));
        let filter = SeverityFilter::with_verifier(
            spy.clone(),
            LevelRange {
                min: LogLevel::Info,
                max: LogLevel::Warning,
            },
        );

        for level in LogLevel::ALL {
            filter.log(&at(level)).unwrap();
        }
        assert_eq!(spy.levels(), vec![LogLevel::Info, LogLevel::Warning]);
    }

    #[test]
    fn test_dispose_propagates_once() {
        let spy = Arc::new(SpySink::new("spy"));
        let filter = SeverityFilter::new(spy.clone(), LogLevel::Debug);
        filter.dispose();
        filter.dispose();
        assert_eq!(spy.dispose_calls(), 1);
    }
}
