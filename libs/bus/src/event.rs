use core::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ember_linear::{List, Map};

/// Handle returned by [`Event::register_callback`], used to unregister.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CallbackId(u64);

struct EventCore<A> {
    /// Events signalled after our own callbacks ran, in registration order.
    listeners: RefCell<List<Weak<EventCore<A>>>>,
    /// Events that signal us; kept so destruction can unlink both sides.
    observing: RefCell<List<Weak<EventCore<A>>>>,
    callbacks: RefCell<Map<u64, Box<dyn FnMut(&A)>>>,
    callback_counter: Cell<u64>,
}

impl<A> EventCore<A> {
    fn unlink_from(list: &RefCell<List<Weak<EventCore<A>>>>, target: *const EventCore<A>) {
        let mut list = list.borrow_mut();
        if let Some(at) = list.as_slice().iter().position(|weak| weak.as_ptr() == target) {
            list.erase(at);
        }
    }
}

/// A signalling node in an event tree.
///
/// Events form a one-way propagation graph: each event runs its own
/// callbacks first, then signals every registered observer, in registration
/// order. Subscriptions are mirrored on both peers and destruction unlinks
/// both sides automatically.
///
/// Events are deliberately single-threaded; callers serialise access or
/// confine signalling to one thread. For cross-thread notification see
/// [`Signal`](crate::Signal).
pub struct Event<A> {
    core: Rc<EventCore<A>>,
}

impl<A> Event<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(EventCore {
                listeners: RefCell::new(List::new()),
                observing: RefCell::new(List::new()),
                callbacks: RefCell::new(Map::new()),
                callback_counter: Cell::new(0),
            }),
        }
    }

    /// Registers `observer` to be signalled whenever this event is.
    ///
    /// # Panics
    ///
    /// In debug builds, panics when `observer` is already registered, when
    /// the registration would close a signalling cycle, or when `observer`
    /// already receives our signals through some longer route.
    pub fn register_observer(&self, observer: &Event<A>) {
        debug_assert!(
            !reachable(&self.core, Rc::as_ptr(&observer.core)),
            "observer already receives this event's signals"
        );
        debug_assert!(
            !reachable(&observer.core, Rc::as_ptr(&self.core)),
            "registering this observer would create a signalling cycle"
        );

        self.core
            .listeners
            .borrow_mut()
            .push_back(Rc::downgrade(&observer.core));
        observer
            .core
            .observing
            .borrow_mut()
            .push_back(Rc::downgrade(&self.core));
    }

    /// Removes `observer` from this event, unlinking both sides. Unknown
    /// observers are ignored.
    pub fn unregister_observer(&self, observer: &Event<A>) {
        EventCore::unlink_from(&self.core.listeners, Rc::as_ptr(&observer.core));
        EventCore::unlink_from(&observer.core.observing, Rc::as_ptr(&self.core));
    }

    /// Registers a callback invoked on every signal, after previously
    /// registered callbacks.
    pub fn register_callback(&self, callback: impl FnMut(&A) + 'static) -> CallbackId {
        let id = self.core.callback_counter.get() + 1;
        self.core.callback_counter.set(id);
        self.core.callbacks.borrow_mut().insert(id, Box::new(callback));
        CallbackId(id)
    }

    /// Removes a previously registered callback. Unknown ids are ignored.
    pub fn unregister_callback(&self, id: CallbackId) {
        self.core.callbacks.borrow_mut().remove(&id.0);
    }

    /// Invokes every callback, then signals every observer, synchronously
    /// on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics when a callback re-enters this event's callback registry
    /// (registering or unregistering callbacks on the event currently
    /// signalling).
    pub fn signal(&self, args: &A) {
        signal_core(&self.core, args);
    }

    /// Number of events observing this one.
    pub fn observer_count(&self) -> usize {
        self.core.listeners.borrow().len()
    }

    /// Number of events this one observes.
    pub fn observing_count(&self) -> usize {
        self.core.observing.borrow().len()
    }
}

fn signal_core<A>(core: &EventCore<A>, args: &A) {
    {
        let mut callbacks = core.callbacks.borrow_mut();
        for callback in callbacks.values_mut() {
            callback(args);
        }
    }

    // Collect strong handles first so a callback dropping an observer
    // mid-walk cannot invalidate the iteration.
    let targets: Vec<Rc<EventCore<A>>> = core
        .listeners
        .borrow()
        .as_slice()
        .iter()
        .filter_map(Weak::upgrade)
        .collect();
    for target in targets {
        signal_core(&target, args);
    }
}

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Drop for Event<A> {
    fn drop(&mut self) {
        let this = Rc::as_ptr(&self.core);
        for weak in self.core.listeners.borrow().as_slice() {
            if let Some(listener) = weak.upgrade() {
                EventCore::unlink_from(&listener.observing, this);
            }
        }
        for weak in self.core.observing.borrow().as_slice() {
            if let Some(observed) = weak.upgrade() {
                EventCore::unlink_from(&observed.listeners, this);
            }
        }
    }
}

/// Depth-first reachability over the listener graph, for cycle detection.
fn reachable<A>(from: &Rc<EventCore<A>>, target: *const EventCore<A>) -> bool {
    if Rc::as_ptr(from) == target {
        return true;
    }
    let listeners = from.listeners.borrow();
    listeners
        .as_slice()
        .iter()
        .filter_map(Weak::upgrade)
        .any(|next| reachable(&next, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;
    use std::rc::Rc as StdRc;

    #[test]
    fn callbacks_fire_in_registration_order() {
        let event = Event::new();
        let seen = StdRc::new(StdRefCell::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = StdRc::clone(&seen);
            event.register_callback(move |value: &u32| {
                seen.borrow_mut().push((tag, *value));
            });
        }
        event.signal(&7);
        assert_eq!(*seen.borrow(), [("a", 7), ("b", 7), ("c", 7)]);
    }

    #[test]
    fn unregistered_callbacks_stay_silent() {
        let event = Event::new();
        let count = StdRc::new(StdRefCell::new(0));
        let id = {
            let count = StdRc::clone(&count);
            event.register_callback(move |_: &()| *count.borrow_mut() += 1)
        };
        event.signal(&());
        event.unregister_callback(id);
        event.signal(&());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn signals_propagate_through_the_tree() {
        let root = Event::new();
        let middle = Event::new();
        let leaf = Event::new();
        root.register_observer(&middle);
        middle.register_observer(&leaf);

        let order = StdRc::new(StdRefCell::new(Vec::new()));
        for (tag, event) in [("root", &root), ("middle", &middle), ("leaf", &leaf)] {
            let order = StdRc::clone(&order);
            event.register_callback(move |_: &u32| order.borrow_mut().push(tag));
        }

        root.signal(&1);
        assert_eq!(*order.borrow(), ["root", "middle", "leaf"]);

        // Propagation is one way: signalling the middle skips the root.
        order.borrow_mut().clear();
        middle.signal(&2);
        assert_eq!(*order.borrow(), ["middle", "leaf"]);
    }

    #[test]
    fn destruction_unlinks_both_sides() {
        let root = Event::<()>::new();
        let leaf = Event::new();
        root.register_observer(&leaf);
        assert_eq!(root.observer_count(), 1);
        assert_eq!(leaf.observing_count(), 1);

        drop(leaf);
        assert_eq!(root.observer_count(), 0);

        let another = Event::<()>::new();
        root.register_observer(&another);
        drop(root);
        assert_eq!(another.observing_count(), 0);
    }

    #[test]
    fn unregister_observer_unlinks_both_sides() {
        let root = Event::<u32>::new();
        let leaf = Event::new();
        root.register_observer(&leaf);
        root.unregister_observer(&leaf);
        assert_eq!(root.observer_count(), 0);
        assert_eq!(leaf.observing_count(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "cycle")]
    fn cycles_are_rejected() {
        let a = Event::<()>::new();
        let b = Event::new();
        a.register_observer(&b);
        b.register_observer(&a);
    }
}
