//! What a producer does when a bounded dispatcher queue is full
//!
//! Only consulted when [`DispatcherBuilder::queue_capacity`] is set; the
//! default queue never fills. Whatever the policy, Error and Critical
//! records wait for room and are never dropped.
//!
//! [`DispatcherBuilder::queue_capacity`]: super::DispatcherBuilder::queue_capacity

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Handling of Debug, Info and Warning records that find the queue full
///
/// Dropped records count towards [`DispatcherMetrics::dropped_count`] and
/// [`DispatcherMetrics::lost_count`]. A producer that is waiting when the
/// dispatcher is disposed stops waiting and hands its records to the
/// emergency sink.
///
/// [`DispatcherMetrics::dropped_count`]: super::DispatcherMetrics::dropped_count
/// [`DispatcherMetrics::lost_count`]: super::DispatcherMetrics::lost_count
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let dispatcher = BackgroundDispatcher::builder(Arc::new(NullSink::new()))
///     .queue_capacity(256)
///     .overflow_policy(OverflowPolicy::BlockWithTimeout(Duration::from_millis(50)))
///     .build()
///     .unwrap();
/// # drop(dispatcher);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Discard the record that did not fit
    DropNewest,

    /// Wait for the worker to make room
    Block,

    /// Wait up to the given time, then discard with an alert
    BlockWithTimeout(Duration),

    /// Discard, reporting the first drop and every thousandth after it
    /// through diagnostics and the overflow callback
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => f.write_str("DropNewest"),
            OverflowPolicy::Block => f.write_str("Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => f.write_str("AlertAndDrop"),
        }
    }
}

/// Receives the running total of dropped records when an alert fires
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alerts() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::AlertAndDrop);
    }

    #[test]
    fn test_display_names() {
        let names: Vec<String> = [
            OverflowPolicy::DropNewest,
            OverflowPolicy::Block,
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(250)),
            OverflowPolicy::AlertAndDrop,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert_eq!(
            names,
            vec!["DropNewest", "Block", "BlockWithTimeout(250ms)", "AlertAndDrop"]
        );
    }
}
