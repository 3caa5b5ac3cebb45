use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

use crate::raw::{self, MAX_COUNT};

/// Owns a block of uninitialised element slots obtained from the raw
/// allocator. This is the resource-management core shared by the owning
/// containers: it tracks `(ptr, capacity)` and nothing else; callers are
/// responsible for which slots are constructed.
///
/// Growth relocates elements bytewise, which is valid for every Rust type
/// as long as the old slots are treated as moved-from.
pub struct RawBuf<T> {
    ptr: NonNull<T>,
    cap: usize,
    _marker: PhantomData<T>,
}

// Safety: `RawBuf` is a plain owning pointer, it carries no thread affinity
// of its own.
unsafe impl<T: Send> Send for RawBuf<T> {}
// Safety: shared access to a `RawBuf` only hands out what `&T` allows.
unsafe impl<T: Sync> Sync for RawBuf<T> {}

impl<T> RawBuf<T> {
    /// An empty buffer. Does not allocate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
            _marker: PhantomData,
        }
    }

    /// Allocates a buffer with room for exactly `cap` elements.
    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        if cap == 0 {
            return Self::new();
        }
        Self {
            ptr: raw::allocate_array::<T>(cap),
            cap,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Grows the buffer so it can hold at least `min_cap` elements. The
    /// first `len` slots must be the constructed ones; they are carried
    /// over to the new storage.
    ///
    /// Growth doubles the capacity (starting from 4) and reallocates in
    /// place whenever the backing block reports slack, so steady
    /// `push`-style growth settles into the block's padding first.
    ///
    /// # Safety
    ///
    /// `len` must not exceed the current capacity and slots `[0, len)` must
    /// be initialised.
    pub unsafe fn grow_to(&mut self, min_cap: usize, len: usize) {
        debug_assert!(len <= self.cap);
        if min_cap <= self.cap {
            return;
        }
        assert!(min_cap < MAX_COUNT, "element count must be in [1, 2^48)");

        let new_cap = min_cap.max(self.cap * 2).max(4);

        if self.cap == 0 {
            self.ptr = raw::allocate_array::<T>(new_cap);
            self.cap = new_cap;
            return;
        }

        let new_size = new_cap
            .checked_mul(mem::size_of::<T>())
            .filter(|size| *size < MAX_COUNT)
            .expect("allocation size must fit in 48 bits");

        // Safety: the buffer is a live array allocation; element relocation
        // is a byte copy and the old slots are dead afterwards.
        self.ptr = unsafe {
            let payload = self.ptr.cast::<u8>();
            if raw::is_in_place_reallocatable(payload, new_size) {
                raw::reallocate_raw(payload, new_size).cast()
            } else {
                let new_ptr = raw::allocate_array::<T>(new_cap);
                ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), len);
                raw::free_raw(payload);
                new_ptr
            }
        };
        self.cap = new_cap;
    }
}

impl<T> Default for RawBuf<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RawBuf<T> {
    fn drop(&mut self) {
        if self.cap != 0 {
            // Safety: a non-zero capacity means the pointer came from the
            // raw allocator; elements were dropped by the owning container.
            unsafe { raw::free_array(self.ptr) };
        }
    }
}

/// Drops the `len` constructed elements starting at `ptr` in reverse order,
/// then poisons the vacated slots with `0xCD` in debug builds.
///
/// # Safety
///
/// `ptr` must point at `len` initialised elements that are not used again.
pub unsafe fn drop_range_in_reverse<T>(ptr: *mut T, len: usize) {
    // Safety: forwarded contract; reverse order so later elements cannot
    // observe earlier ones half-dead.
    unsafe {
        for i in (0..len).rev() {
            ptr::drop_in_place(ptr.add(i));
        }
        if cfg!(debug_assertions) && mem::size_of::<T>() > 0 {
            ptr::write_bytes(ptr.cast::<u8>(), 0xCD, len * mem::size_of::<T>());
        }
    }
}
