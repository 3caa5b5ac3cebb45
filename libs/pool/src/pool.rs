use core::any::TypeId;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use core::time::Duration;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

use ember_diag::{Exception, LogSeverity, Logger, record, record_argument};
use ember_linear::{List, Optional, UniquePtr};

use crate::error::ScheduleError;
use crate::shared::{QueuedTask, SharedData, erase_task};
use crate::task::{Task, TaskContext, TaskId, TaskResult, TaskState};
use crate::thread::{PoolThread, ThreadDescription, ThreadId, WorkerShared, WorkerState};

/// Construction parameters of a [`ThreadPool`].
#[derive(Clone)]
pub struct ThreadPoolCreateInfo {
    /// Logger the pool reports task failures and shutdown exceptions to.
    pub logger: Arc<Logger>,
}

/// A fixed set of cooperative worker threads over one shared task queue.
///
/// The thread that constructs the pool becomes the *main thread*: only it
/// may add or remove workers, and it is the only place worker exceptions
/// re-enter user code. See the crate docs for the execution model.
pub struct ThreadPool {
    create_info: ThreadPoolCreateInfo,
    main_thread: thread::ThreadId,
    shared: Arc<SharedData>,
    threads: List<ThreadDescription>,
    task_id_counter: AtomicU64,
    thread_id_counter: AtomicU64,
    shutting_down: AtomicBool,
}

impl ThreadPool {
    /// Captures the calling thread as the main thread. No workers are
    /// started until [`add_thread`](Self::add_thread).
    #[must_use]
    pub fn new(create_info: ThreadPoolCreateInfo) -> Self {
        Self {
            create_info,
            main_thread: thread::current().id(),
            shared: Arc::new(SharedData::new()),
            threads: List::new(),
            task_id_counter: AtomicU64::new(0),
            thread_id_counter: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    fn assert_main_thread(&self, what: &str) {
        assert_eq!(
            thread::current().id(),
            self.main_thread,
            "{what} is only permitted from the thread that created the pool"
        );
    }

    /// Starts a worker thread around `pool_thread` and waits for it to come
    /// up.
    ///
    /// # Errors
    ///
    /// When the thread's [`PoolThread::begin`] fails, every worker is
    /// evacuated and the startup failure is returned with the thread's
    /// exception as its inner cause.
    ///
    /// # Panics
    ///
    /// Panics when called from a non-main thread or while shutting down.
    pub fn add_thread<T: PoolThread>(&mut self, pool_thread: T) -> Result<ThreadId, Exception> {
        self.assert_main_thread("adding threads");
        assert!(
            !self.shutting_down.load(Ordering::Acquire),
            "cannot add threads while shutting down the pool"
        );

        let thread_id = self.thread_id_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let worker = Arc::new(WorkerShared::new());

        let handle = {
            let worker = Arc::clone(&worker);
            let shared = Arc::clone(&self.shared);
            let logger = Arc::clone(&self.create_info.logger);
            thread::Builder::new()
                .name(std::format!("ember-worker-{thread_id}"))
                .spawn(move || run_worker(pool_thread, thread_id, &worker, &shared, &logger))
                .expect("failed to spawn a worker thread")
        };

        self.threads.push_back(ThreadDescription {
            thread_id,
            type_id: TypeId::of::<T>(),
            worker: Arc::clone(&worker),
            join_handle: Some(handle),
        });

        // Wait for the thread to start.
        while worker.state() == WorkerState::Uninitialized {
            thread::sleep(Duration::from_micros(10));
        }
        if worker.state() == WorkerState::InitializationError {
            let mut exception = Exception::from_text("failed to start a thread pool thread");
            if let Some(raised) = self.shared.take_exception() {
                self.shared.exception_handled.store(true, Ordering::Release);
                exception.set_next(&raised.exception);
            }
            self.evacuate_threads();
            return Err(exception);
        }

        Ok(thread_id)
    }

    /// Stops and joins the worker `thread_id`. The task queue must be
    /// empty.
    ///
    /// # Panics
    ///
    /// Panics when called from a non-main thread, while shutting down, or
    /// while tasks are queued.
    pub fn remove_thread(&mut self, thread_id: ThreadId) {
        self.assert_main_thread("removing threads");
        assert!(
            !self.shutting_down.load(Ordering::Acquire),
            "cannot remove threads while shutting down the pool"
        );
        assert_eq!(
            self.task_queue_count(),
            0,
            "threads cannot be removed while tasks are queued"
        );

        let Some(at) = self
            .threads
            .as_slice()
            .iter()
            .position(|description| description.thread_id == thread_id)
        else {
            return;
        };

        let description = &mut self.threads[at];
        description.worker.should_exit.store(true, Ordering::Release);
        while !description.worker.ready_to_join.load(Ordering::Acquire) {
            self.shared.wakeup.notify_all();
            thread::sleep(Duration::from_micros(10));
        }
        if let Some(handle) = description.join_handle.take() {
            let _ = handle.join();
        }
        self.threads.erase(at);
    }

    /// Schedules a task with no constraints.
    pub fn schedule<T: Task>(&self, task: T) -> Result<TaskId, ScheduleError> {
        self.publish(erase_task(task), List::new(), None)
    }

    /// Schedules a task that may only start once every task in
    /// `dependencies` has completed.
    pub fn schedule_with_dependencies<T: Task>(
        &self,
        dependencies: &[TaskId],
        task: T,
    ) -> Result<TaskId, ScheduleError> {
        self.publish(erase_task(task), dependencies.into(), None)
    }

    /// Schedules a task restricted to workers whose `PoolThread` is of type
    /// `P`. The restriction is resolved against the live threads at
    /// schedule time.
    pub fn schedule_to_thread_type<P: PoolThread, T: Task>(
        &self,
        task: T,
    ) -> Result<TaskId, ScheduleError> {
        let affinity = self.threads_of_type::<P>();
        self.publish(erase_task(task), List::new(), Some(affinity))
    }

    /// As [`schedule_to_thread_type`](Self::schedule_to_thread_type), with
    /// prerequisites.
    pub fn schedule_to_thread_type_with_dependencies<P: PoolThread, T: Task>(
        &self,
        dependencies: &[TaskId],
        task: T,
    ) -> Result<TaskId, ScheduleError> {
        let affinity = self.threads_of_type::<P>();
        self.publish(erase_task(task), dependencies.into(), Some(affinity))
    }

    fn threads_of_type<P: PoolThread>(&self) -> List<ThreadId> {
        self.threads
            .as_slice()
            .iter()
            .filter(|description| description.type_id == TypeId::of::<P>())
            .map(|description| description.thread_id)
            .collect()
    }

    fn publish(
        &self,
        task: UniquePtr<dyn Task>,
        dependencies: List<TaskId>,
        affinity: Option<List<ThreadId>>,
    ) -> Result<TaskId, ScheduleError> {
        assert!(
            !self.shutting_down.load(Ordering::Acquire),
            "cannot schedule tasks while shutting down the pool"
        );
        if self.shared.exception_raised() {
            return Err(ScheduleError::Faulted);
        }

        let id = self.task_id_counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.shared.add_task(QueuedTask {
            id,
            state: TaskState::Queued,
            dependencies,
            affinity,
            task: Optional::with_value(task),
        });
        tracing::trace!(task = id, "scheduled");
        Ok(id)
    }

    /// Tasks currently queued, running tasks included.
    pub fn task_queue_count(&self) -> usize {
        self.shared.task_count()
    }

    /// Tasks currently executing on a worker.
    pub fn task_running_count(&self) -> usize {
        self.shared.running_count()
    }

    /// Queue-side state of a task. `None` once it has been retired, so a
    /// completed task and an unknown id look the same; a `Failed` answer
    /// means the task faulted and awaits evacuation.
    pub fn task_state(&self, task_id: TaskId) -> Option<TaskState> {
        self.shared.task_state(task_id)
    }

    /// System id of worker `thread_id`, when it exists.
    pub fn thread_system_id(&self, thread_id: ThreadId) -> Option<thread::ThreadId> {
        self.threads
            .as_slice()
            .iter()
            .find(|description| description.thread_id == thread_id)
            .and_then(|description| {
                description
                    .join_handle
                    .as_ref()
                    .map(|handle| handle.thread().id())
            })
    }

    /// Wakes every worker and surfaces a raised worker exception.
    ///
    /// # Errors
    ///
    /// The evacuated thread exception, wrapped so the message names the
    /// offending thread and the original failure is the inner cause.
    pub fn run(&mut self) -> Result<(), Exception> {
        self.shared.wakeup.notify_all();
        match self.handle_thread_exception() {
            Some(exception) => Err(exception),
            None => Ok(()),
        }
    }

    /// Blocks until the task queue is empty.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run).
    pub fn wait_idle(&mut self) -> Result<(), Exception> {
        while !self.shared.is_task_list_empty() {
            self.shared.wakeup.notify_all();
            if let Some(exception) = self.handle_thread_exception() {
                return Err(exception);
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    /// Observes a raised worker exception: evacuates every thread and
    /// returns the wrapper exception. `None` when nothing was raised, the
    /// fault was already handled, or this is not the main thread.
    fn handle_thread_exception(&mut self) -> Option<Exception> {
        if thread::current().id() != self.main_thread {
            return None;
        }
        if !self.shared.exception_raised() {
            return None;
        }
        if self.shared.exception_handled.swap(true, Ordering::AcqRel) {
            return None;
        }

        let raised = self.shared.take_exception()?;
        self.evacuate_threads();

        let mut message = record_argument("Exception thrown in thread", raised.thread_id);
        message.append(&record("\n"));
        let mut exception = Exception::new(message);
        exception.set_next(&raised.exception);
        Some(exception)
    }

    /// Forced shutdown of every worker. After evacuation the pool holds no
    /// threads and no tasks.
    fn evacuate_threads(&mut self) {
        self.assert_main_thread("evacuating threads");

        self.shared.threads_should_exit.store(true, Ordering::Release);
        while self
            .threads
            .as_slice()
            .iter()
            .any(|description| !description.worker.ready_to_join.load(Ordering::Acquire))
        {
            self.shared.wakeup.notify_all();
            thread::sleep(Duration::from_millis(1));
        }

        for description in self.threads.as_mut_slice() {
            if let Some(handle) = description.join_handle.take() {
                let _ = handle.join();
            }
        }
        self.threads.clear();
        self.shared.clear_tasks();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutting_down.store(true, Ordering::Release);

        let mut report = |pool: &mut Self| {
            if let Some(exception) = pool.handle_thread_exception() {
                pool.create_info
                    .logger
                    .log_exception(LogSeverity::CriticalError, &exception);
            }
        };
        report(self);

        // Wait for all outstanding work to drain.
        while !self.shared.is_task_list_empty() {
            self.shared.wakeup.notify_all();
            thread::sleep(Duration::from_millis(1));
            report(self);
        }
        report(self);

        // Signal the stop and keep waking workers until every one of them
        // is ready to join. Evacuation already did this when an exception
        // was raised.
        self.shared.threads_should_exit.store(true, Ordering::Release);
        while self
            .threads
            .as_slice()
            .iter()
            .any(|description| !description.worker.ready_to_join.load(Ordering::Acquire))
        {
            self.shared.wakeup.notify_all();
            thread::sleep(Duration::from_millis(1));
        }
        for description in self.threads.as_mut_slice() {
            if let Some(handle) = description.join_handle.take() {
                let _ = handle.join();
            }
        }
    }
}

fn exception_from_panic(payload: Box<dyn core::any::Any + Send>, context: &str) -> Exception {
    match payload.downcast::<Exception>() {
        Ok(exception) => *exception,
        Err(payload) => {
            let text = payload
                .downcast_ref::<&str>()
                .copied()
                .map(str::to_owned)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| String::from("unknown panic payload"));
            let mut message = record(context);
            message.append(&record("\n"));
            let mut argument = record_argument("panic message", text.as_str());
            argument.add_indent(1);
            message.append(&argument);
            Exception::new(message)
        }
    }
}

/// The worker entrypoint: begin hook, the find-execute loop, end hook.
fn run_worker<T: PoolThread>(
    mut pool_thread: T,
    thread_id: ThreadId,
    worker: &WorkerShared,
    shared: &SharedData,
    logger: &Logger,
) {
    let _span = tracing::debug_span!("worker", thread = thread_id).entered();

    let begin = catch_unwind(AssertUnwindSafe(|| pool_thread.begin()));
    let started = match begin {
        Ok(Ok(())) => true,
        Ok(Err(exception)) => {
            shared.report_exception(exception, thread_id);
            false
        }
        Err(payload) => {
            shared.report_exception(
                exception_from_panic(payload, "panic while starting a worker thread"),
                thread_id,
            );
            false
        }
    };
    if !started {
        worker.set_state(WorkerState::InitializationError);
        let _ = catch_unwind(AssertUnwindSafe(|| pool_thread.end()));
        worker.ready_to_join.store(true, Ordering::Release);
        return;
    }

    worker.set_state(WorkerState::Running);

    while !shared.threads_should_exit.load(Ordering::Acquire)
        && !worker.should_exit.load(Ordering::Acquire)
    {
        worker.set_state(WorkerState::Running);

        if let Some((task_id, mut task)) = shared.find_work(thread_id) {
            // There is probably more work where this came from.
            shared.wakeup.notify_all();
            tracing::trace!(task = task_id, "executing");

            let mut cx = TaskContext { task_id, thread_id };
            let outcome = catch_unwind(AssertUnwindSafe(|| task.run(&mut cx)));

            match outcome {
                Ok(TaskResult::Paused) => shared.reschedule_task(task_id, task),
                Ok(TaskResult::Finished) => shared.retire_task(task_id, TaskState::Completed),
                Ok(TaskResult::Error) => {
                    logger.warning(ember_diag::record_assert_text!(
                        "Thread task failed",
                        "Task id",
                        task_id,
                        "Thread id",
                        thread_id,
                    ));
                    shared.retire_task(task_id, TaskState::Failed);
                }
                Err(payload) => {
                    // The task is deliberately not retired: its entry keeps
                    // dependents blocked so they are evacuated with
                    // everything else instead of running after a fault.
                    shared.mark_task_failed(task_id);
                    shared.report_exception(
                        exception_from_panic(payload, "exception thrown in a worker task"),
                        thread_id,
                    );
                    break;
                }
            }
            continue;
        }

        worker.set_state(WorkerState::Idle);
        shared.wait_for_work();
    }

    tracing::debug!("worker shutting down");
    let _ = catch_unwind(AssertUnwindSafe(|| pool_thread.end()));
    worker.set_state(WorkerState::Idle);
    worker.ready_to_join.store(true, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{task_fn, task_fn_ctx, task_fn_result};
    use ember_diag::LoggerCreateInfo;
    use ember_linear::View as _;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct GeneralThread;
    impl PoolThread for GeneralThread {}

    struct LoaderThread;
    impl PoolThread for LoaderThread {}

    struct FailingThread;
    impl PoolThread for FailingThread {
        fn begin(&mut self) -> Result<(), Exception> {
            Err(Exception::from_text("loader backend unavailable"))
        }
    }

    fn quiet_logger() -> Arc<Logger> {
        Arc::new(Logger::new(LoggerCreateInfo {
            print_to_system_console: false,
            ..LoggerCreateInfo::default()
        }))
    }

    fn pool_with_workers(count: usize) -> ThreadPool {
        let mut pool = ThreadPool::new(ThreadPoolCreateInfo {
            logger: quiet_logger(),
        });
        for _ in 0..count {
            pool.add_thread(GeneralThread).expect("worker must start");
        }
        pool
    }

    #[test]
    fn tasks_run_and_the_queue_drains() {
        let mut pool = pool_with_workers(3);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..32 {
            let counter = Arc::clone(&counter);
            pool.schedule(task_fn(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();
        }
        pool.wait_idle().unwrap();

        assert_eq!(counter.load(Ordering::Relaxed), 32);
        assert_eq!(pool.task_queue_count(), 0);
    }

    #[test]
    fn dependencies_order_execution() {
        let mut pool = pool_with_workers(2);
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let order = Arc::clone(&order);
            pool.schedule(task_fn(move || {
                std::thread::sleep(Duration::from_millis(50));
                order.lock().unwrap().push("first");
            }))
            .unwrap()
        };
        let second = {
            let order = Arc::clone(&order);
            pool.schedule_with_dependencies(
                &[first],
                task_fn(move || order.lock().unwrap().push("second")),
            )
            .unwrap()
        };
        let third = {
            let order = Arc::clone(&order);
            pool.schedule_with_dependencies(
                &[second],
                task_fn(move || order.lock().unwrap().push("third")),
            )
            .unwrap()
        };

        // The tail of the chain cannot have started yet: its prerequisite
        // is still blocked behind the sleeping head.
        assert_eq!(pool.task_state(third), Some(TaskState::Queued));

        pool.wait_idle().unwrap();
        assert_eq!(*order.lock().unwrap(), ["first", "second", "third"]);
        assert_eq!(pool.task_state(third), None);
    }

    #[test]
    fn paused_tasks_are_rescheduled_to_the_tail() {
        let mut pool = pool_with_workers(1);
        let polls = Arc::new(AtomicUsize::new(0));

        {
            let polls = Arc::clone(&polls);
            pool.schedule(task_fn_result(move || {
                if polls.fetch_add(1, Ordering::Relaxed) < 2 {
                    TaskResult::Paused
                } else {
                    TaskResult::Finished
                }
            }))
            .unwrap();
        }

        pool.wait_idle().unwrap();
        assert_eq!(polls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn thread_type_affinity_is_honoured() {
        let mut pool = ThreadPool::new(ThreadPoolCreateInfo {
            logger: quiet_logger(),
        });
        pool.add_thread(GeneralThread).unwrap();
        let loader_id = pool.add_thread(LoaderThread).unwrap();

        let observed = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..8 {
            let observed = Arc::clone(&observed);
            pool.schedule_to_thread_type::<LoaderThread, _>(task_fn_ctx(move |cx| {
                observed.lock().unwrap().push(cx.thread_id());
            }))
            .unwrap();
        }

        pool.wait_idle().unwrap();
        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 8);
        assert!(observed.view().iter().all(|&id| id == loader_id));
    }

    #[test]
    fn task_error_logs_a_warning_and_completes() {
        let logger = quiet_logger();
        let mut pool = ThreadPool::new(ThreadPoolCreateInfo {
            logger: Arc::clone(&logger),
        });
        pool.add_thread(GeneralThread).unwrap();

        pool.schedule(task_fn_result(|| TaskResult::Error)).unwrap();
        pool.wait_idle().unwrap();

        let history = logger.log_history();
        assert!(
            history
                .as_slice()
                .iter()
                .any(|entry| entry.message.to_plain_text().to_string().contains("Thread task failed"))
        );
    }

    #[test]
    fn worker_panic_surfaces_on_the_main_thread() {
        let mut pool = pool_with_workers(2);

        pool.schedule(task_fn(|| panic!("task exploded"))).unwrap();

        let error = loop {
            match pool.run() {
                Err(error) => break error,
                Ok(()) => std::thread::sleep(Duration::from_millis(1)),
            }
        };

        let text = error.message().to_plain_text().to_string();
        assert!(text.contains("Exception thrown in thread"));
        let cause = error.next().expect("original failure is the inner cause");
        assert!(cause.message().to_plain_text().to_string().contains("task exploded"));

        // The pool refuses new work after the fault.
        assert_eq!(pool.schedule(task_fn(|| ())), Err(ScheduleError::Faulted));
        assert_eq!(pool.task_queue_count(), 0);
    }

    #[test]
    fn failed_dependents_are_evacuated_not_run() {
        let mut pool = pool_with_workers(1);
        let ran = Arc::new(AtomicUsize::new(0));

        let faulty = pool.schedule(task_fn(|| panic!("primary fault"))).unwrap();
        {
            let ran = Arc::clone(&ran);
            pool.schedule_with_dependencies(
                &[faulty],
                task_fn(move || {
                    ran.fetch_add(1, Ordering::Relaxed);
                }),
            )
            .unwrap();
        }

        assert!(pool.wait_idle().is_err());
        assert_eq!(ran.load(Ordering::Relaxed), 0);
        assert_eq!(pool.task_queue_count(), 0);
    }

    #[test]
    fn initialization_error_is_nested_and_the_pool_recovers_nothing() {
        let mut pool = ThreadPool::new(ThreadPoolCreateInfo {
            logger: quiet_logger(),
        });
        pool.add_thread(GeneralThread).unwrap();

        let error = pool.add_thread(FailingThread).expect_err("begin fails");
        assert!(
            error
                .message()
                .to_plain_text()
                .to_string()
                .contains("failed to start a thread pool thread")
        );
        let cause = error.next().expect("hook failure is the cause");
        assert!(cause.to_string().contains("loader backend unavailable"));
    }

    #[test]
    fn remove_thread_joins_and_forgets_the_worker() {
        let mut pool = pool_with_workers(2);
        pool.wait_idle().unwrap();

        let target = pool.threads.as_slice()[0].thread_id;
        pool.remove_thread(target);
        assert!(pool.thread_system_id(target).is_none());
        assert_eq!(pool.threads.len(), 1);
    }
}
