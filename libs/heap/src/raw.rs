use core::mem;
use core::ptr::{self, NonNull};
use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};

use static_assertions::const_assert_eq;

/// Size in bytes of the allocation header written in front of every payload.
pub const HEADER_SIZE: usize = 64;

/// Largest accepted payload alignment, 32 KiB.
pub const MAX_ALIGN: usize = 0x8000;

/// Exclusive upper bound for payload sizes and element counts, 2^48.
pub const MAX_COUNT: usize = 1 << 48;

/// Pointer bit patterns left behind by common debug fills. A candidate
/// pointer matching one of these is a freed or uninitialised value, never a
/// live payload.
const POISON_PATTERNS: [usize; 4] = [
    usize::from_ne_bytes([0xCD; 8]),
    usize::from_ne_bytes([0xDD; 8]),
    usize::from_ne_bytes([0xFD; 8]),
    usize::from_ne_bytes([0xCC; 8]),
];

/// Byte used to overwrite freed payload memory in debug builds.
const FREED_FILL: u8 = 0xCD;

/// Allocation record stored at `payload - HEADER_SIZE` for every live
/// allocation made through this crate.
///
/// The payload pointer differs from the system pointer because of alignment
/// padding; both are kept so the allocation can be released and introspected
/// without any out-of-band bookkeeping.
#[repr(C, align(64))]
pub struct AllocHeader {
    system_ptr: *mut u8,
    payload_ptr: *mut u8,
    system_size: usize,
    payload_size: usize,
    payload_align: usize,
    reserved: [usize; 2],
    checksum: usize,
}

const_assert_eq!(mem::size_of::<AllocHeader>(), HEADER_SIZE);
const_assert_eq!(mem::align_of::<AllocHeader>(), 64);

impl AllocHeader {
    /// Size of the backing system allocation in bytes.
    #[inline]
    pub fn system_size(&self) -> usize {
        self.system_size
    }

    /// Size of the payload in bytes as last requested by the caller.
    #[inline]
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Alignment the payload was requested with.
    #[inline]
    pub fn payload_align(&self) -> usize {
        self.payload_align
    }

    /// Bytes available to the payload without moving it.
    #[inline]
    fn slack(&self) -> usize {
        let end = self.system_ptr as usize + self.system_size;
        end - self.payload_ptr as usize
    }

    fn compute_checksum(&self) -> usize {
        fold_header_bytes(self)
    }

    fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    fn verify(&self) -> bool {
        self.checksum == self.compute_checksum()
    }
}

cfg_if::cfg_if! {
    if #[cfg(debug_assertions)] {
        /// XOR fold over every header byte except the checksum word itself.
        fn fold_header_bytes(header: &AllocHeader) -> usize {
            let bytes = ptr::from_ref(header).cast::<u8>();
            let mut checksum = 0_usize;
            for i in 0..HEADER_SIZE - mem::size_of::<usize>() {
                // Safety: `i` stays within the header, which is a live
                // reference for the duration of this call.
                checksum ^= usize::from(unsafe { *bytes.add(i) });
            }
            checksum
        }
    } else {
        /// Checksums are disabled outside development builds, errors should
        /// have been caught there.
        fn fold_header_bytes(_header: &AllocHeader) -> usize {
            0
        }
    }
}

#[inline]
fn assert_align(align: usize) {
    assert!(align > 0, "payload alignment must be larger than 0");
    assert!(
        align <= MAX_ALIGN,
        "payload alignment must be smaller or equal to 32 KiB"
    );
    assert!(align.is_power_of_two(), "payload alignment must be a power of 2");
}

#[inline]
fn assert_size(size: usize) {
    assert!(size > 0, "payload size must be larger than 0");
    assert!(size < MAX_COUNT, "payload size must fit in 48 bits");
}

#[inline]
fn align_up(value: usize, align: usize) -> usize {
    (value - 1) / align * align + align
}

/// Allocates `size` bytes aligned to `align`, with an [`AllocHeader`]
/// written immediately in front of the returned payload.
///
/// The returned pointer is aligned to `max(align, 64)`.
///
/// # Panics
///
/// Panics when `align` is zero, above [`MAX_ALIGN`] or not a power of two,
/// or when `size` is zero or does not fit in 48 bits. Out-of-memory is
/// fatal and diverts to [`handle_alloc_error`].
pub fn allocate_raw(size: usize, align: usize) -> NonNull<u8> {
    assert_size(size);
    assert_align(align);

    let align = align.max(mem::align_of::<AllocHeader>());
    let system_size = size + align + HEADER_SIZE;
    let layout = Layout::from_size_align(system_size, mem::align_of::<AllocHeader>())
        .expect("system allocation layout overflow");

    // Safety: `layout` has non-zero size, asserted above.
    let system_ptr = unsafe { alloc(layout) };
    if system_ptr.is_null() {
        handle_alloc_error(layout);
    }

    let payload_addr = align_up(system_ptr as usize + HEADER_SIZE, align);
    debug_assert!(payload_addr + size <= system_ptr as usize + system_size);

    // Safety: `payload_addr` stays inside the system allocation, which
    // leaves room for the header in front of it.
    let payload_ptr = unsafe { system_ptr.add(payload_addr - system_ptr as usize) };

    let mut header = AllocHeader {
        system_ptr,
        payload_ptr,
        system_size,
        payload_size: size,
        payload_align: align,
        reserved: [0; 2],
        checksum: 0,
    };
    header.seal();

    // Safety: computed above, the header slot lives inside the system
    // allocation and is aligned to 64.
    unsafe {
        payload_ptr.sub(HEADER_SIZE).cast::<AllocHeader>().write(header);
        NonNull::new_unchecked(payload_ptr)
    }
}

/// Recovers the allocation header preceding `payload`.
///
/// Returns `None` for null or under-aligned pointers, for pointers whose bit
/// pattern matches a known debug fill, and (in debug builds) when the header
/// checksum does not match, meaning `payload` was not produced by
/// [`allocate_raw`] or its header was corrupted.
///
/// # Safety
///
/// If `payload` was produced by this crate it must still be live. Any other
/// pointer must be valid for reads of [`HEADER_SIZE`] bytes in front of it
/// or fail one of the cheap pre-checks (null, alignment, poison pattern).
pub unsafe fn header_of<'a>(payload: *const u8) -> Option<&'a AllocHeader> {
    if payload.is_null() {
        return None;
    }
    let addr = payload as usize;
    if addr % mem::align_of::<AllocHeader>() != 0 {
        return None;
    }
    if POISON_PATTERNS.contains(&addr) {
        return None;
    }

    // Safety: alignment was checked, caller guarantees readability.
    let header = unsafe { &*payload.sub(HEADER_SIZE).cast::<AllocHeader>() };
    if cfg!(debug_assertions) && !header.verify() {
        return None;
    }
    Some(header)
}

/// Releases an allocation previously returned by [`allocate_raw`].
///
/// In debug builds the header checksum is verified and the payload is
/// overwritten with `0xCD` before the system memory is released.
///
/// # Safety
///
/// `payload` must have been returned by [`allocate_raw`] or
/// [`reallocate_raw`] and must not have been freed already.
pub unsafe fn free_raw(payload: NonNull<u8>) {
    // Safety: per this function's contract the header is live.
    let header = unsafe {
        let header = &*payload.as_ptr().sub(HEADER_SIZE).cast::<AllocHeader>();
        debug_assert!(header.verify(), "allocation header checksum mismatch");
        ptr::read(header)
    };

    if cfg!(debug_assertions) {
        // Safety: the payload is live for `payload_size` bytes.
        unsafe {
            ptr::write_bytes(payload.as_ptr(), FREED_FILL, header.payload_size);
        }
    }

    let layout = Layout::from_size_align(header.system_size, mem::align_of::<AllocHeader>())
        .expect("system allocation layout overflow");
    // Safety: `system_ptr` came out of `alloc` with exactly this layout.
    unsafe { dealloc(header.system_ptr, layout) };
}

/// Returns true when the backing block of `payload` has enough slack to hold
/// `new_size` bytes without moving the payload.
///
/// # Safety
///
/// `payload` must be a live allocation from this crate.
pub unsafe fn is_in_place_reallocatable(payload: NonNull<u8>, new_size: usize) -> bool {
    // Safety: forwarded contract.
    let header = unsafe { &*payload.as_ptr().sub(HEADER_SIZE).cast::<AllocHeader>() };
    new_size <= header.slack()
}

/// Grows or shrinks an allocation to `new_size` bytes, preserving the
/// alignment of the original allocation.
///
/// Contents are carried over byte for byte with no construction or
/// destruction, so the memory must hold trivially relocatable data (in Rust
/// terms: anything, as long as the old location is treated as moved-from).
/// When the backing block has slack the header is rewritten in place and the
/// payload pointer is unchanged; otherwise a fresh block is allocated, the
/// old bytes are copied over and the old block is freed.
///
/// # Safety
///
/// `payload` must be a live allocation from this crate; after the call only
/// the returned pointer may be used.
pub unsafe fn reallocate_raw(payload: NonNull<u8>, new_size: usize) -> NonNull<u8> {
    assert_size(new_size);

    // Safety: forwarded contract.
    let header_ptr = unsafe { payload.as_ptr().sub(HEADER_SIZE).cast::<AllocHeader>() };
    // Safety: header is live per contract.
    let (slack, old_size, align) = unsafe {
        let header = &*header_ptr;
        debug_assert!(header.verify(), "allocation header checksum mismatch");
        (header.slack(), header.payload_size, header.payload_align)
    };

    if new_size <= slack {
        // Safety: in-place growth only mutates the header, which stays
        // inside the live system allocation.
        unsafe {
            (*header_ptr).payload_size = new_size;
            (*header_ptr).seal();
        }
        return payload;
    }

    let new_payload = allocate_raw(new_size, align);
    // Safety: both blocks are live and distinct, the copy length is bounded
    // by both payload sizes.
    unsafe {
        ptr::copy_nonoverlapping(payload.as_ptr(), new_payload.as_ptr(), old_size.min(new_size));
        free_raw(payload);
    }
    new_payload
}

/// Allocates uninitialised storage for `count` elements of `T`.
///
/// # Panics
///
/// Panics when `count` is zero or at least [`MAX_COUNT`], or when `T` is
/// zero sized; the containers above never store zero-sized element types.
pub fn allocate_array<T>(count: usize) -> NonNull<T> {
    assert!(mem::size_of::<T>() > 0, "zero-sized element types are not supported");
    assert!(count > 0 && count < MAX_COUNT, "element count must be in [1, 2^48)");
    let size = count
        .checked_mul(mem::size_of::<T>())
        .filter(|size| *size < MAX_COUNT)
        .expect("allocation size must fit in 48 bits");
    allocate_raw(size, mem::align_of::<T>()).cast()
}

/// Typed front-end to [`free_raw`].
///
/// # Safety
///
/// `ptr` must have come from [`allocate_array`] or [`reallocate_array`] with
/// the same `T`, all elements must already be dropped, and the allocation
/// must not have been freed already.
pub unsafe fn free_array<T>(ptr: NonNull<T>) {
    // Safety: forwarded contract.
    unsafe { free_raw(ptr.cast()) }
}

/// Typed front-end to [`reallocate_raw`], restricted to `Copy` elements
/// because contents are relocated bytewise with no per-element handling.
///
/// # Safety
///
/// `ptr` must be a live array allocation of `T`; after the call only the
/// returned pointer may be used.
pub unsafe fn reallocate_array<T: Copy>(ptr: NonNull<T>, new_count: usize) -> NonNull<T> {
    assert!(new_count > 0 && new_count < MAX_COUNT, "element count must be in [1, 2^48)");
    let size = new_count
        .checked_mul(mem::size_of::<T>())
        .filter(|size| *size < MAX_COUNT)
        .expect("allocation size must fit in 48 bits");
    // Safety: forwarded contract.
    unsafe { reallocate_raw(ptr.cast(), size).cast() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_aligned_and_introspectable() {
        let ptr = allocate_raw(100, 1);
        assert_eq!(ptr.as_ptr() as usize % 64, 0);

        // Safety: `ptr` is live.
        let header = unsafe { header_of(ptr.as_ptr()) }.expect("header must validate");
        assert_eq!(header.payload_size(), 100);
        assert!(header.system_size() >= 100 + HEADER_SIZE);

        // Safety: allocated above, freed once.
        unsafe { free_raw(ptr) };
    }

    #[test]
    fn strict_alignment_is_honoured() {
        for align in [64_usize, 128, 1024, 0x8000] {
            let ptr = allocate_raw(8, align);
            assert_eq!(ptr.as_ptr() as usize % align, 0);
            // Safety: allocated above, freed once.
            unsafe { free_raw(ptr) };
        }
    }

    #[test]
    fn header_of_rejects_junk() {
        // Safety: all candidates fail the pre-checks before any read.
        unsafe {
            assert!(header_of(ptr::null()).is_none());
            assert!(header_of(ptr::without_provenance(33)).is_none());
            assert!(header_of(ptr::without_provenance(usize::from_ne_bytes([0xCD; 8]))).is_none());
        }
    }

    #[test]
    fn in_place_growth_keeps_the_pointer() {
        let ptr = allocate_raw(16, 8);
        // The block over-allocates by `align + HEADER_SIZE`, so a small
        // growth must fit in the slack.
        // Safety: `ptr` is live.
        unsafe {
            assert!(is_in_place_reallocatable(ptr, 24));
            let grown = reallocate_raw(ptr, 24);
            assert_eq!(grown, ptr);
            let header = header_of(grown.as_ptr()).expect("header survives in-place growth");
            assert_eq!(header.payload_size(), 24);
            free_raw(grown);
        }
    }

    #[test]
    fn moving_reallocation_preserves_contents() {
        let ptr = allocate_array::<u32>(4);
        // Safety: freshly allocated storage for 4 u32s.
        unsafe {
            for i in 0..4 {
                ptr.as_ptr().add(i).write(u32::try_from(i).unwrap() * 7);
            }
            let grown = reallocate_array::<u32>(ptr, 100_000);
            for i in 0..4 {
                assert_eq!(*grown.as_ptr().add(i), u32::try_from(i).unwrap() * 7);
            }
            free_array(grown);
        }
    }

    #[test]
    #[should_panic(expected = "power of 2")]
    fn non_power_of_two_alignment_panics() {
        allocate_raw(8, 3);
    }

    #[test]
    #[should_panic(expected = "48 bits")]
    fn oversized_allocation_panics() {
        allocate_raw(MAX_COUNT, 8);
    }
}
