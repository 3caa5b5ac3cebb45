//! Linear containers and ownership primitives built on the raw allocator.
//!
//! The family shares one resource-management core, [`ember_heap::RawBuf`]:
//! [`List`] is the growable workhorse, [`Array`] the fixed-size stack
//! container, [`Optional`] a single in-place slot and [`UniquePtr`] the
//! single-owner heap slot with checked down-casting. Borrowed access is
//! expressed through the [`View`]/[`ViewMut`] capability traits rather than
//! separate view types; owning containers implement both.

mod array;
mod list;
mod map;
mod optional;
mod pod_buffer;
mod unique;
mod view;

pub use array::Array;
pub use list::{IntoIter, List};
pub use map::Map;
pub use optional::Optional;
pub use pod_buffer::PodBuffer;
pub use unique::UniquePtr;
pub use view::{View, ViewMut};
