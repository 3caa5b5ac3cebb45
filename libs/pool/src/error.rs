use core::fmt;

/// Why a schedule call produced no task.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// A worker raised an exception; the pool refuses new work until the
    /// main thread has observed it.
    Faulted,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Faulted => f.write_str("a worker thread raised an exception, pool is faulted"),
        }
    }
}

impl core::error::Error for ScheduleError {}
