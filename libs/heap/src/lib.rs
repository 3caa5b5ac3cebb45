//! Raw memory facility underneath every container in the runtime.
//!
//! Every live allocation handed out by this crate is preceded by a 64-byte
//! self-describing [`AllocHeader`] which records the system pointer, the
//! sizes involved and the payload alignment. In debug builds the header
//! carries an XOR-fold checksum so stray writes in front of a payload are
//! caught at free time, and freed payloads are poisoned with `0xCD`.

mod raw;
mod raw_buf;

pub use raw::{
    AllocHeader, HEADER_SIZE, MAX_ALIGN, MAX_COUNT, allocate_array, allocate_raw, free_array,
    free_raw, header_of, is_in_place_reallocatable, reallocate_array, reallocate_raw,
};
pub use raw_buf::{RawBuf, drop_range_in_reverse};
