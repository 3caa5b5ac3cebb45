use core::any::Any;
use core::marker::PhantomData;

use ember_linear::{List, UniquePtr};
use parking_lot::Mutex;

use crate::signal::Signal;

/// A compile-time set of packet types a [`MessageBus`] accepts. Implemented
/// by the [`packet_set!`](crate::packet_set) macro, never by hand.
pub trait PacketSet: 'static {}

/// Membership of a packet type in a [`PacketSet`], carrying its stable
/// index within the set. Sending or claiming a type that was not listed in
/// the set fails to compile because this bound is unsatisfied.
pub trait PacketMember<S: PacketSet>: Any + Send {
    const INDEX: usize;
}

/// Declares a packet set for a [`MessageBus`]:
///
/// ```ignore
/// packet_set! {
///     /// Packets exchanged between the frame loop and the loaders.
///     pub struct EnginePackets: RenderResultPacket, AssetLoadedPacket;
/// }
/// type EngineBus = MessageBus<EnginePackets>;
/// ```
#[macro_export]
macro_rules! packet_set {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $($packet:ty),+ $(,)?;
    ) => {
        $(#[$meta])*
        $vis struct $name;

        impl $crate::PacketSet for $name {}

        $crate::packet_set!(@members $name, 0, $($packet),+);
    };
    (@members $name:ident, $index:expr, $packet:ty) => {
        impl $crate::PacketMember<$name> for $packet {
            const INDEX: usize = $index;
        }
    };
    (@members $name:ident, $index:expr, $packet:ty, $($rest:ty),+) => {
        impl $crate::PacketMember<$name> for $packet {
            const INDEX: usize = $index;
        }
        $crate::packet_set!(@members $name, $index + 1, $($rest),+);
    };
}

struct StoredPacket {
    id: u64,
    type_index: usize,
    packet: UniquePtr<dyn Any + Send>,
}

struct BusInner {
    packets: List<StoredPacket>,
    id_counter: u64,
}

/// A typed packet mailbox with single-consumer claim semantics.
///
/// Packets are owned by the bus from [`send_packet`](Self::send_packet)
/// until exactly one consumer moves them out with
/// [`claim_packet`](Self::claim_packet). The set of allowed packet types is
/// fixed at compile time through a [`PacketSet`]. All operations are
/// internally thread-safe.
pub struct MessageBus<S: PacketSet> {
    inner: Mutex<BusInner>,
    /// Raised with the packet id after every send, on the sending thread
    /// and outside the bus lock.
    pub on_packet_sent: Signal<u64>,
    _marker: PhantomData<S>,
}

impl<S: PacketSet> MessageBus<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BusInner {
                packets: List::new(),
                id_counter: 0,
            }),
            on_packet_sent: Signal::new(),
            _marker: PhantomData,
        }
    }

    /// Stores `packet` under a fresh monotonic id, then raises
    /// [`on_packet_sent`](Self::on_packet_sent) with it.
    pub fn send_packet<T: PacketMember<S>>(&self, packet: UniquePtr<T>) -> u64 {
        let id = {
            let mut inner = self.inner.lock();
            inner.id_counter += 1;
            let id = inner.id_counter;
            inner.packets.push_back(StoredPacket {
                id,
                type_index: T::INDEX,
                packet: packet.erase(),
            });
            id
        };
        tracing::trace!(packet = id, "packet sent");
        self.on_packet_sent.raise(&id);
        id
    }

    /// Moves the packet with `id` out of the bus.
    ///
    /// Returns `None` when the id is unknown (including already claimed).
    /// When the id is present but the stored packet is not a `T`, the
    /// packet stays in the bus and `None` is returned; claiming it again
    /// with the correct type succeeds.
    pub fn claim_packet<T: PacketMember<S>>(&self, id: u64) -> Option<UniquePtr<T>> {
        let mut inner = self.inner.lock();

        let at = inner.packets.as_slice().iter().position(|stored| stored.id == id)?;
        if inner.packets[at].type_index != T::INDEX {
            tracing::error!(
                packet = id,
                "claim with mismatching packet type, packet remains in the bus"
            );
            return None;
        }

        let stored = inner.packets.erase(at);
        match stored.packet.downcast::<T>() {
            Ok(packet) => Some(packet),
            Err(_) => None,
        }
    }

    /// Packets currently waiting to be claimed.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().packets.len()
    }
}

impl<S: PacketSet> Default for MessageBus<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct RenderPacket(u32);

    #[derive(Debug, PartialEq)]
    struct AudioPacket(&'static str);

    packet_set! {
        struct TestPackets: RenderPacket, AudioPacket;
    }

    type TestBus = MessageBus<TestPackets>;

    #[test]
    fn claim_is_single_consumer() {
        let bus = TestBus::new();
        let id = bus.send_packet(UniquePtr::new(RenderPacket(7)));
        assert_eq!(id, 1);

        // Wrong type: the packet stays.
        assert!(bus.claim_packet::<AudioPacket>(id).is_none());
        assert_eq!(bus.pending_count(), 1);

        // Right type: moved out.
        let packet = bus.claim_packet::<RenderPacket>(id).expect("packet is present");
        assert_eq!(*packet, RenderPacket(7));

        // A second claim finds nothing.
        assert!(bus.claim_packet::<RenderPacket>(id).is_none());
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn ids_are_monotonic_across_types() {
        let bus = TestBus::new();
        assert_eq!(bus.send_packet(UniquePtr::new(RenderPacket(1))), 1);
        assert_eq!(bus.send_packet(UniquePtr::new(AudioPacket("ding"))), 2);
        assert_eq!(bus.send_packet(UniquePtr::new(RenderPacket(3))), 3);

        assert_eq!(bus.claim_packet::<AudioPacket>(2).expect("present").0, "ding");
    }

    #[test]
    fn send_raises_the_signal_with_the_id() {
        let bus = TestBus::new();
        let seen = Arc::new(AtomicU64::new(0));
        {
            let seen = Arc::clone(&seen);
            bus.on_packet_sent.register(move |id| {
                seen.store(*id, Ordering::Relaxed);
            });
        }
        let id = bus.send_packet(UniquePtr::new(AudioPacket("thud")));
        assert_eq!(seen.load(Ordering::Relaxed), id);
    }

    #[test]
    fn bus_is_usable_across_threads() {
        let bus = Arc::new(TestBus::new());
        let sender = {
            let bus = Arc::clone(&bus);
            std::thread::spawn(move || bus.send_packet(UniquePtr::new(RenderPacket(99))))
        };
        let id = sender.join().expect("sender thread");
        let packet = bus.claim_packet::<RenderPacket>(id).expect("packet crossed threads");
        assert_eq!(packet.0, 99);
    }
}
