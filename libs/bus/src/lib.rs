//! Hierarchical events and the typed message bus.
//!
//! [`Event`] is a single-threaded multi-listener tree: signalling an event
//! runs its callbacks, then propagates to every observing event, one way
//! only. [`MessageBus`] is the thread-safe counterpart for moving owned
//! packets between subsystems: a packet is sent once and claimed by exactly
//! one consumer. The bus announces arrivals through a [`Signal`], the
//! thread-safe callback list.

mod bus;
mod event;
mod signal;

pub use bus::{MessageBus, PacketMember, PacketSet};
pub use event::{CallbackId, Event};
pub use signal::Signal;
