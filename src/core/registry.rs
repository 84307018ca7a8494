//! Process-wide "current logger" slot
//!
//! For call sites that have no sink threaded to them. Code that can take an
//! `Arc<dyn Sink>` explicitly should do that instead. The slot is meant to be
//! set once during startup and read afterwards; replacing it later works but
//! does not dispose the previous sink.

use super::sink::Sink;
use crate::sinks::NullSink;
use parking_lot::RwLock;
use std::sync::Arc;

static CURRENT: RwLock<Option<Arc<dyn Sink>>> = RwLock::new(None);

/// Install `sink` as the current logger, returning the one it replaced
pub fn set_current(sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
    CURRENT.write().replace(sink)
}

pub fn current() -> Option<Arc<dyn Sink>> {
    CURRENT.read().clone()
}

/// The current logger, or a [`NullSink`] when none is installed
pub fn current_or_null() -> Arc<dyn Sink> {
    current().unwrap_or_else(|| Arc::new(NullSink::new()))
}

/// Empty the slot, handing the caller the sink so it can be disposed
pub fn take_current() -> Option<Arc<dyn Sink>> {
    CURRENT.write().take()
}
