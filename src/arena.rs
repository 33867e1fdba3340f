/*!
 * Bump Arena
 * Fixed-capacity bump-pointer allocation over a borrowed byte range
 *
 * # Performance
 *
 * - `allocate`: O(1), aligns the cursor forward and zero-fills the span
 * - `resize`: O(1) in place for the most recent allocation, otherwise a
 *   fresh allocation plus a copy
 * - `reset`: O(1), rewinds both cursors; bytes are re-zeroed lazily per
 *   allocation
 */

use crate::hooks::PoisonHooks;
use crate::types::{ArenaError, ArenaResult};
use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// Aligns `addr` forward to the next multiple of `align`.
///
/// `align` must be a power of two.
#[inline]
pub fn align_forward(addr: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
    (addr + align - 1) & !(align - 1)
}

/// Bump allocator over one contiguous byte range.
///
/// The arena borrows its backing buffer for the duration of its scope; it
/// never frees the memory itself (that is the pool's or the caller's
/// concern). Two cursors track state: `curr_offset` is the next free byte,
/// `prev_offset` the start of the most recent allocation, which enables
/// in-place growth for the vector-push pattern.
///
/// All operations take `&self` (interior mutability), which also makes the
/// type `!Sync`: an arena is owned by exactly one thread at a time. Handing
/// one to another thread is a move, never a share.
///
/// Every span handed out is zero-filled, so plain-old-data reads behave as
/// if default-constructed.
#[derive(Debug)]
pub struct Arena<'buf> {
    buf: NonNull<u8>,
    capacity: usize,
    prev_offset: Cell<usize>,
    curr_offset: Cell<usize>,
    generation: Cell<u64>,
    hooks: PoisonHooks,
    // Exclusive borrow of the backing bytes; `&mut` stays covariant in its
    // lifetime, which lets `Arena<'static>` pool buffers shorten to any
    // borrowing scope.
    _buffer: PhantomData<&'buf mut [u8]>,
}

// SAFETY: the arena is an exclusive view over its byte range; moving it to
// another thread moves that exclusivity with it. `Cell` keeps it !Sync.
unsafe impl Send for Arena<'_> {}

impl<'buf> Arena<'buf> {
    /// Wraps a byte range with instrumentation disabled.
    #[inline]
    pub fn new(buf: &'buf mut [u8]) -> Self {
        Self::with_hooks(buf, PoisonHooks::disabled())
    }

    /// Wraps a byte range and poisons all of it through `hooks`.
    pub fn with_hooks(buf: &'buf mut [u8], hooks: PoisonHooks) -> Self {
        let capacity = buf.len();
        // SAFETY: slice pointers are never null.
        let ptr = unsafe { NonNull::new_unchecked(buf.as_mut_ptr()) };
        (hooks.poison)(ptr.as_ptr(), capacity);
        Self {
            buf: ptr,
            capacity,
            prev_offset: Cell::new(0),
            curr_offset: Cell::new(0),
            generation: Cell::new(0),
            hooks,
            _buffer: PhantomData,
        }
    }

    /// Wraps a raw byte range, e.g. a pool buffer.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `capacity` bytes that are valid for reads and
    /// writes for the arena's whole lifetime, and nothing else may access
    /// them while the arena exists.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, capacity: usize) -> Arena<'static> {
        Arena {
            buf: ptr,
            capacity,
            prev_offset: Cell::new(0),
            curr_offset: Cell::new(0),
            generation: Cell::new(0),
            hooks: PoisonHooks::disabled(),
            _buffer: PhantomData,
        }
    }

    /// Allocates `size` zero-filled bytes at the given alignment.
    ///
    /// Fails with [`ArenaError::Exhausted`] without mutating state when the
    /// aligned span does not fit in the remaining capacity. `align` must be
    /// a power of two; alignment is computed on the absolute address.
    pub fn allocate(&self, size: usize, align: usize) -> ArenaResult<NonNull<u8>> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

        let base = self.buf.as_ptr() as usize;
        let offset = align_forward(base + self.curr_offset.get(), align) - base;
        let end = match offset.checked_add(size) {
            Some(end) if end <= self.capacity => end,
            _ => return Err(self.exhausted(size, align)),
        };

        self.prev_offset.set(offset);
        self.curr_offset.set(end);

        // SAFETY: offset + size <= capacity, so the span is inside the buffer.
        let ptr = unsafe { self.buf.as_ptr().add(offset) };
        (self.hooks.unpoison)(ptr, size);
        unsafe { ptr::write_bytes(ptr, 0, size) };
        // SAFETY: derived from a non-null base.
        Ok(unsafe { NonNull::new_unchecked(ptr) })
    }

    /// Grows or shrinks an allocation.
    ///
    /// `None` (or `old_size == 0`) behaves as [`Arena::allocate`]. If `ptr`
    /// is the most recent allocation the cursor moves in place, zero-filling
    /// only the added tail; this is the container-growth fast path and the
    /// reason the pointer-identity check is sound only under the
    /// one-thread-per-arena contract. Any other pointer gets a fresh
    /// allocation plus a copy of `min(old_size, new_size)` bytes; the old
    /// span stays dead until [`Arena::reset`].
    ///
    /// A pointer outside the arena's range is a caller bug: debug builds
    /// assert, release builds report [`ArenaError::OutOfBounds`].
    pub fn resize(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> ArenaResult<NonNull<u8>> {
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

        let old = match ptr {
            Some(old) if old_size != 0 => old,
            _ => return self.allocate(new_size, align),
        };

        let base = self.buf.as_ptr() as usize;
        let addr = old.as_ptr() as usize;
        if addr < base || addr >= base + self.capacity {
            debug_assert!(
                false,
                "resize pointer 0x{addr:x} outside arena range [0x{base:x}, 0x{:x})",
                base + self.capacity
            );
            return Err(ArenaError::OutOfBounds {
                address: addr,
                base,
                capacity: self.capacity,
            });
        }

        let prev = self.prev_offset.get();
        if addr == base + prev {
            // Most recent allocation: move the cursor in place.
            let end = match prev.checked_add(new_size) {
                Some(end) if end <= self.capacity => end,
                _ => return Err(self.exhausted(new_size, align)),
            };
            let old_end = self.curr_offset.get();
            self.curr_offset.set(end);
            if new_size > old_size {
                let grown = new_size - old_size;
                // SAFETY: prev + old_size <= end <= capacity.
                let tail = unsafe { self.buf.as_ptr().add(prev + old_size) };
                (self.hooks.unpoison)(tail, grown);
                unsafe { ptr::write_bytes(tail, 0, grown) };
            } else if end < old_end {
                // SAFETY: end < old_end <= capacity.
                let trimmed = unsafe { self.buf.as_ptr().add(end) };
                (self.hooks.poison)(trimmed, old_end - end);
            }
            return Ok(old);
        }

        // Not the most recent allocation: true reallocation, no reclamation.
        let fresh = self.allocate(new_size, align)?;
        // SAFETY: both spans lie inside the buffer; ptr::copy tolerates
        // overlap should the caller misreport old_size.
        unsafe { ptr::copy(old.as_ptr(), fresh.as_ptr(), old_size.min(new_size)) };
        Ok(fresh)
    }

    /// Rewinds both cursors to zero, reclaiming the whole arena.
    ///
    /// Bytes are not zeroed eagerly; each later allocation zero-fills its
    /// own span. Bumps the generation so checkpoints taken before the reset
    /// become detectably stale.
    pub fn reset(&self) {
        (self.hooks.poison)(self.buf.as_ptr(), self.capacity);
        self.prev_offset.set(0);
        self.curr_offset.set(0);
        self.generation.set(self.generation.get() + 1);
    }

    /// Releases an individual span for instrumentation purposes only.
    ///
    /// Arenas have no per-object free; this clears poisoning for the span
    /// and nothing else. Container adapters call it from `deallocate`.
    #[inline]
    pub fn dealloc(&self, ptr: NonNull<u8>, size: usize) {
        (self.hooks.unpoison)(ptr.as_ptr(), size);
    }

    /// Total capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes consumed so far (next free offset)
    #[inline]
    pub fn used(&self) -> usize {
        self.curr_offset.get()
    }

    /// Bytes left before exhaustion, ignoring alignment padding
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.curr_offset.get()
    }

    /// Start offset of the most recent allocation
    #[inline]
    pub fn previous_offset(&self) -> usize {
        self.prev_offset.get()
    }

    /// Reset generation, bumped by every [`Arena::reset`]
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// True if nothing is currently allocated
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.curr_offset.get() == 0
    }

    /// True if `ptr` points into the arena's byte range
    #[inline]
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let base = self.buf.as_ptr() as usize;
        addr >= base && addr < base + self.capacity
    }

    pub(crate) fn offsets(&self) -> (usize, usize) {
        (self.prev_offset.get(), self.curr_offset.get())
    }

    /// Restores a saved cursor pair, poisoning the discarded range.
    pub(crate) fn rewind_to(&self, prev: usize, curr: usize) {
        let live = self.curr_offset.get();
        if curr < live {
            // SAFETY: curr < live <= capacity.
            let discarded = unsafe { self.buf.as_ptr().add(curr) };
            (self.hooks.poison)(discarded, live - curr);
        }
        self.prev_offset.set(prev);
        self.curr_offset.set(curr);
    }

    fn exhausted(&self, size: usize, align: usize) -> ArenaError {
        ArenaError::Exhausted {
            requested: size,
            align,
            remaining: self.remaining(),
            capacity: self.capacity,
        }
    }
}

impl Drop for Arena<'_> {
    fn drop(&mut self) {
        // Hand the range back clean for whoever reuses it.
        (self.hooks.unpoison)(self.buf.as_ptr(), self.capacity);
    }
}
