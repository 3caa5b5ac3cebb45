//! The engine runtime, assembled.
//!
//! Re-exports the foundation crates under one roof and provides
//! [`Runtime`], the conventional way to stand the core services up
//! together: one logger handle threaded into one thread pool.

pub use ember_bus as bus;
pub use ember_diag as diag;
pub use ember_heap as heap;
pub use ember_linear as linear;
pub use ember_pool as pool;
pub use ember_text as text;

use std::sync::Arc;

use ember_diag::{Logger, LoggerCreateInfo, record_argument};
use ember_pool::{ThreadPool, ThreadPoolCreateInfo};

/// Construction parameters of a [`Runtime`].
#[derive(Clone, Debug, Default)]
pub struct RuntimeCreateInfo {
    pub logger: LoggerCreateInfo,
}

/// The assembled core services.
///
/// Owns the logger and the thread pool; the thread constructing the
/// runtime becomes the pool's main thread. Dropping the runtime drains and
/// joins the pool before the logger goes away.
pub struct Runtime {
    logger: Arc<Logger>,
    thread_pool: ThreadPool,
}

impl Runtime {
    #[must_use]
    pub fn new(create_info: &RuntimeCreateInfo) -> Self {
        let logger = Arc::new(Logger::new(create_info.logger));
        let thread_pool = ThreadPool::new(ThreadPoolCreateInfo {
            logger: Arc::clone(&logger),
        });
        tracing::debug!("runtime constructed");
        Self {
            logger,
            thread_pool,
        }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn thread_pool(&self) -> &ThreadPool {
        &self.thread_pool
    }

    pub fn thread_pool_mut(&mut self) -> &mut ThreadPool {
        &mut self.thread_pool
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.logger
            .verbose(record_argument("runtime shutting down, tasks still queued", self.thread_pool.task_queue_count()));
    }
}
