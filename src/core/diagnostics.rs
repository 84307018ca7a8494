//! Last-resort reporting channel for failures inside the pipeline
//!
//! The pipeline cannot log its own failures through itself, so delivery
//! errors that nobody else can absorb are written to stderr and handed to an
//! optional process-wide hook.

use super::error::LoggerError;
use parking_lot::RwLock;
use std::io::Write;
use std::sync::Arc;

/// Callback invoked for every reported failure
pub type DiagnosticHook = Arc<dyn Fn(&LoggerError) + Send + Sync>;

static HOOK: RwLock<Option<DiagnosticHook>> = RwLock::new(None);

/// Install a hook, returning the previous one
pub fn set_hook(hook: DiagnosticHook) -> Option<DiagnosticHook> {
    HOOK.write().replace(hook)
}

pub fn clear_hook() -> Option<DiagnosticHook> {
    HOOK.write().take()
}

/// Report a failure. Never panics and never returns an error.
pub fn report(error: &LoggerError) {
    let prefix = if error.is_loss() {
        "[LOGGER CRITICAL]"
    } else {
        "[LOGGER ERROR]"
    };

    // stderr may be closed; nothing left to fall back to
    let _ = writeln!(std::io::stderr().lock(), "{} {}", prefix, error);

    let hook = HOOK.read().clone();
    if let Some(hook) = hook {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(error)));
    }
}

/// Render a panic payload the way `catch_unwind` hands it back
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }

    #[test]
    fn test_report_survives_panicking_hook() {
        let previous = set_hook(Arc::new(|_| panic!("hook exploded")));
        report(&LoggerError::other("diagnostics self-test"));
        match previous {
            Some(hook) => {
                set_hook(hook);
            }
            None => {
                clear_hook();
            }
        }
    }
}
