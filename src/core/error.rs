//! Error types for the log pipeline

use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A sink failed to write one or more records
    #[error("Sink '{sink}' failed to deliver: {message}")]
    SinkDelivery { sink: String, message: String },

    /// Some records of a batch failed; `failed` holds their batch indices
    #[error("Partial delivery: {} record(s) failed ({source})", .failed.len())]
    PartialDelivery {
        failed: Vec<usize>,
        #[source]
        source: Box<LoggerError>,
    },

    /// Even the emergency sink could not take the records
    #[error("Emergency sink '{sink}' failed, records lost: {message}")]
    FallbackDelivery { sink: String, message: String },

    /// A sink panicked while handling records
    #[error("Sink '{sink}' panicked: {message}")]
    SinkPanicked { sink: String, message: String },

    /// Queue overflow with dropped record count
    #[error("Log queue overflow: dropped {dropped_count} records")]
    QueueOverflow { dropped_count: u64 },

    /// Final flush did not finish in time
    #[error("Shutdown of '{sink}' exceeded {timeout:?} with {pending} record(s) pending")]
    ShutdownTimeout {
        sink: String,
        timeout: Duration,
        pending: u64,
    },

    /// Sink was already disposed
    #[error("Sink '{0}' already disposed")]
    SinkDisposed(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a sink delivery error
    pub fn delivery(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkDelivery {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a partial delivery error from the failed batch indices
    pub fn partial(failed: Vec<usize>, source: LoggerError) -> Self {
        LoggerError::PartialDelivery {
            failed,
            source: Box::new(source),
        }
    }

    /// Create a fallback delivery error
    pub fn fallback(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FallbackDelivery {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a sink panic error
    pub fn panicked(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkPanicked {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a queue overflow error
    pub fn queue_overflow(dropped_count: u64) -> Self {
        LoggerError::QueueOverflow { dropped_count }
    }

    /// Create a shutdown timeout error
    pub fn shutdown_timeout(sink: impl Into<String>, timeout: Duration, pending: u64) -> Self {
        LoggerError::ShutdownTimeout {
            sink: sink.into(),
            timeout,
            pending,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Indices of failed records when only part of a batch failed
    pub fn failed_indices(&self) -> Option<&[usize]> {
        match self {
            LoggerError::PartialDelivery { failed, .. } => Some(failed),
            _ => None,
        }
    }

    /// Whether this error means records were irrecoverably lost
    pub fn is_loss(&self) -> bool {
        matches!(self, LoggerError::FallbackDelivery { .. })
    }
}
