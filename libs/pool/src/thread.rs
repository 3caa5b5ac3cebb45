use core::any::{Any, TypeId};
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use ember_diag::Exception;

/// Unique, monotonically assigned worker-thread identifier.
pub type ThreadId = u64;

/// A worker thread's private resources and lifecycle hooks.
///
/// [`begin`](Self::begin) runs on the worker before it accepts any work;
/// returning an error aborts the thread with an initialization failure that
/// [`ThreadPool::add_thread`](crate::ThreadPool::add_thread) surfaces on
/// the main thread. [`end`](Self::end) runs on the worker after its loop
/// exits, on every path.
///
/// The concrete type doubles as the task-affinity key: tasks can be
/// restricted to threads of one `PoolThread` type.
pub trait PoolThread: Any + Send {
    fn begin(&mut self) -> Result<(), Exception> {
        Ok(())
    }

    fn end(&mut self) {}
}

/// Observable lifecycle of a worker thread.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Uninitialized,
    InitializationError,
    Running,
    Idle,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::InitializationError,
            2 => Self::Running,
            _ => Self::Idle,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::InitializationError => 1,
            Self::Running => 2,
            Self::Idle => 3,
        }
    }
}

/// Per-worker flags shared between the worker and the main thread.
pub(crate) struct WorkerShared {
    state: AtomicU8,
    pub(crate) should_exit: AtomicBool,
    pub(crate) ready_to_join: AtomicBool,
}

impl WorkerShared {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Uninitialized.to_u8()),
            should_exit: AtomicBool::new(false),
            ready_to_join: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }
}

/// Main-thread bookkeeping for one worker.
pub(crate) struct ThreadDescription {
    pub(crate) thread_id: ThreadId,
    /// Concrete `PoolThread` type, the affinity key.
    pub(crate) type_id: TypeId,
    pub(crate) worker: std::sync::Arc<WorkerShared>,
    pub(crate) join_handle: Option<std::thread::JoinHandle<()>>,
}
