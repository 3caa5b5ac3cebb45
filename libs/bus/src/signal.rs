use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ember_linear::Map;
use parking_lot::Mutex;

/// A thread-safe callback list.
///
/// The cross-thread counterpart of [`Event`](crate::Event): callbacks may
/// be registered from any thread and are invoked synchronously on whichever
/// thread raises the signal, in registration order. The registry lock is
/// not held during invocation, so callbacks may freely register or
/// unregister.
pub struct Signal<A> {
    callbacks: Mutex<Map<u64, Arc<dyn Fn(&A) + Send + Sync>>>,
    counter: AtomicU64,
}

impl<A> Signal<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Map::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Registers a callback, returning the id to unregister it with.
    pub fn register(&self, callback: impl Fn(&A) + Send + Sync + 'static) -> u64 {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.callbacks.lock().insert(id, Arc::new(callback));
        id
    }

    /// Removes a callback. Unknown ids are ignored.
    pub fn unregister(&self, id: u64) {
        self.callbacks.lock().remove(&id);
    }

    /// Invokes every callback with `args` on the calling thread.
    pub fn raise(&self, args: &A) {
        let snapshot: Vec<Arc<dyn Fn(&A) + Send + Sync>> = {
            let callbacks = self.callbacks.lock();
            callbacks.iter().map(|(_, callback)| Arc::clone(callback)).collect()
        };
        for callback in snapshot {
            callback(args);
        }
    }
}

impl<A> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}
