use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use ember_diag::Exception;
use ember_linear::{List, Optional, UniquePtr};
use parking_lot::{Condvar, Mutex};

use crate::task::{Task, TaskId, TaskState};
use crate::thread::ThreadId;

/// Type-erases a concrete task into an owned `dyn Task`.
pub(crate) fn erase_task<T: Task>(task: T) -> UniquePtr<dyn Task> {
    let raw: *mut dyn Task = UniquePtr::new(task).into_raw().as_ptr();
    // Safety: produced by `into_raw` just above; only the fat-pointer type
    // changed.
    unsafe { UniquePtr::from_raw(NonNull::new_unchecked(raw)) }
}

/// One queue entry. The task object itself is taken out while a worker runs
/// it; the entry stays in the queue so dependents remain blocked until
/// completion removes it.
pub(crate) struct QueuedTask {
    pub(crate) id: TaskId,
    pub(crate) state: TaskState,
    pub(crate) dependencies: List<TaskId>,
    /// Thread ids this task may run on; `None` means any.
    pub(crate) affinity: Option<List<ThreadId>>,
    pub(crate) task: Optional<UniquePtr<dyn Task>>,
}

/// The captured thread exception plus the id of the thread that raised it.
pub(crate) struct RaisedException {
    pub(crate) exception: Exception,
    pub(crate) thread_id: ThreadId,
}

/// State shared between the pool (main thread) and all workers.
pub(crate) struct SharedData {
    tasks: Mutex<List<QueuedTask>>,
    pub(crate) wakeup: Condvar,
    pub(crate) wakeup_mutex: Mutex<()>,
    exception: Mutex<Optional<RaisedException>>,
    exception_raised: AtomicBool,
    pub(crate) exception_handled: AtomicBool,
    pub(crate) threads_should_exit: AtomicBool,
}

impl SharedData {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Mutex::new(List::new()),
            wakeup: Condvar::new(),
            wakeup_mutex: Mutex::new(()),
            exception: Mutex::new(Optional::new()),
            exception_raised: AtomicBool::new(false),
            exception_handled: AtomicBool::new(false),
            threads_should_exit: AtomicBool::new(false),
        }
    }

    pub(crate) fn add_task(&self, task: QueuedTask) {
        self.tasks.lock().push_back(task);
        self.wakeup.notify_one();
    }

    /// Takes the first task eligible for `thread_id`: queued or paused,
    /// affinity matching, and no prerequisite still present in the queue.
    pub(crate) fn find_work(&self, thread_id: ThreadId) -> Option<(TaskId, UniquePtr<dyn Task>)> {
        let mut tasks = self.tasks.lock();

        let mut found = None;
        for at in 0..tasks.len() {
            let entry = &tasks[at];
            if !matches!(entry.state, TaskState::Queued | TaskState::Paused) {
                continue;
            }
            if let Some(affinity) = &entry.affinity {
                if !affinity.as_slice().contains(&thread_id) {
                    continue;
                }
            }
            let blocked = entry
                .dependencies
                .as_slice()
                .iter()
                .any(|dep| tasks.as_slice().iter().any(|other| other.id == *dep));
            if blocked {
                continue;
            }
            found = Some(at);
            break;
        }

        let at = found?;
        let entry = &mut tasks[at];
        entry.state = TaskState::Running;
        let task = entry.task.take()?;
        Some((entry.id, task))
    }

    /// Puts a paused task back at the queue tail.
    pub(crate) fn reschedule_task(&self, id: TaskId, task: UniquePtr<dyn Task>) {
        let mut tasks = self.tasks.lock();
        let Some(at) = tasks.as_slice().iter().position(|entry| entry.id == id) else {
            return;
        };
        let mut entry = tasks.erase(at);
        entry.state = TaskState::Paused;
        entry.task.emplace(task);
        tasks.push_back(entry);
    }

    /// Records the final transition of a task and removes it from the
    /// queue, unblocking dependents. `state` is [`TaskState::Completed`]
    /// for a finished task and [`TaskState::Failed`] for one that reported
    /// an error.
    pub(crate) fn retire_task(&self, id: TaskId, state: TaskState) {
        let mut tasks = self.tasks.lock();
        if let Some(at) = tasks.as_slice().iter().position(|entry| entry.id == id) {
            tasks[at].state = state;
            tracing::trace!(task = id, state = ?state, "task retired");
            tasks.erase(at);
        }
    }

    /// Marks a task as failed without removing it. Used on the panic path:
    /// the entry stays in the queue so dependents remain blocked until
    /// evacuation clears everything.
    pub(crate) fn mark_task_failed(&self, id: TaskId) {
        let mut tasks = self.tasks.lock();
        if let Some(at) = tasks.as_slice().iter().position(|entry| entry.id == id) {
            tasks[at].state = TaskState::Failed;
        }
    }

    /// Queue-side state of a task; `None` once it has been retired (or was
    /// never scheduled).
    pub(crate) fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.tasks
            .lock()
            .as_slice()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.state)
    }

    pub(crate) fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub(crate) fn running_count(&self) -> usize {
        self.tasks
            .lock()
            .as_slice()
            .iter()
            .filter(|entry| entry.state == TaskState::Running)
            .count()
    }

    pub(crate) fn is_task_list_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    pub(crate) fn clear_tasks(&self) {
        self.tasks.lock().clear();
    }

    pub(crate) fn exception_raised(&self) -> bool {
        self.exception_raised.load(Ordering::Acquire)
    }

    /// Publishes a worker exception. First writer wins; later raises are
    /// dropped. Signals every thread to exit and wakes them.
    pub(crate) fn report_exception(&self, exception: Exception, thread_id: ThreadId) {
        {
            let mut slot = self.exception.lock();
            if self.exception_raised.load(Ordering::Acquire) {
                return;
            }
            slot.emplace(RaisedException {
                exception,
                thread_id,
            });
            self.exception_raised.store(true, Ordering::Release);
        }
        self.threads_should_exit.store(true, Ordering::Release);
        self.wakeup.notify_all();
    }

    /// Takes the captured exception. Main thread only; the caller marks the
    /// fault handled.
    pub(crate) fn take_exception(&self) -> Option<RaisedException> {
        self.exception.lock().take()
    }

    /// Bounded idle wait at the bottom of the worker loop. Every path that
    /// adds work signals the condvar, the timeout is housekeeping only.
    pub(crate) fn wait_for_work(&self) {
        let mut guard = self.wakeup_mutex.lock();
        let _ = self.wakeup.wait_for(&mut guard, Duration::from_millis(10));
    }
}
