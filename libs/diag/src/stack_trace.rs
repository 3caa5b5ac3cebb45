use core::fmt;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::Arc;

/// A captured stack trace.
///
/// The capture is shared behind an `Arc` so diagnostic values that carry a
/// trace stay cheap to clone; exception chains copy freely.
#[derive(Clone)]
pub struct StackTrace {
    inner: Arc<Backtrace>,
}

impl StackTrace {
    /// Captures the current call stack. Respects the standard
    /// `RUST_BACKTRACE` environment gates; when capture is disabled the
    /// value still exists but renders as unsupported.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            inner: Arc::new(Backtrace::capture()),
        }
    }

    /// Always captures, regardless of environment gates.
    #[must_use]
    pub fn force_capture() -> Self {
        Self {
            inner: Arc::new(Backtrace::force_capture()),
        }
    }

    /// `true` when the capture actually recorded frames.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.inner.status() == BacktraceStatus::Captured
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}
