//! Cooperative worker-thread pool.
//!
//! A fixed set of worker threads drains a shared task queue. Tasks may
//! declare prerequisite tasks and may be restricted to threads of a given
//! type; they cooperate by returning [`TaskResult::Paused`] to be
//! rescheduled at the queue tail. A panic escaping a task is captured into
//! the shared exception slot and the pool fail-stops: workers evacuate and
//! the exception re-surfaces on the main thread at the next [`ThreadPool::run`],
//! [`ThreadPool::wait_idle`], schedule call or drop.

mod error;
mod pool;
mod shared;
mod task;
mod thread;

pub use error::ScheduleError;
pub use pool::{ThreadPool, ThreadPoolCreateInfo};
pub use task::{
    Task, TaskContext, TaskId, TaskResult, TaskState, task_fn, task_fn_ctx, task_fn_ctx_result,
    task_fn_result,
};
pub use thread::{PoolThread, ThreadId, WorkerState};
