/*!
 * Container Allocator Adapter
 * Lets generic containers place their storage inside an arena
 *
 * Implements `allocator_api2::alloc::Allocator` (the stable stand-in for
 * `core::alloc::Allocator`), so `allocator_api2::vec::Vec`, boxed values
 * and friends can be backed by an [`Arena`]. The allocator contract is
 * untyped (`Layout`-based), so there is no per-element-type rebinding; one
 * adapter serves every element type of the same arena.
 */

use crate::arena::Arena;
use crate::scratch::ScratchCheckpoint;
use allocator_api2::alloc::{AllocError, Allocator};
use core::alloc::Layout;
use std::ptr::{self, NonNull};

/// Value-semantic allocator handle over an [`Arena`].
///
/// `MIN_ALIGN` raises the alignment floor for every allocation the adapter
/// makes; the default of 16 matches `max_align_t` on the targets we ship on.
/// Two adapters compare equal iff they reference the same arena and share
/// `MIN_ALIGN`, which is what lets containers treat assignment between them
/// as a cheap pointer copy.
///
/// `deallocate` reclaims nothing (arena semantics are bulk reset, not
/// per-object free); `grow` rides the arena's in-place fast path when the
/// block is the most recent allocation, which makes repeated `Vec::push`
/// cheap.
///
/// ```
/// use bump_pool::{Arena, ArenaAllocator};
/// use allocator_api2::vec::Vec;
///
/// let mut buf = [0u8; 1024];
/// let arena = Arena::new(&mut buf);
///
/// let mut v: Vec<u32, ArenaAllocator> = Vec::new_in(ArenaAllocator::new(&arena));
/// v.extend([1, 2, 3]);
/// assert_eq!(v.as_slice(), &[1, 2, 3]);
/// assert!(arena.used() > 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ArenaAllocator<'a, const MIN_ALIGN: usize = 16> {
    arena: &'a Arena<'a>,
}

impl<'a, const MIN_ALIGN: usize> ArenaAllocator<'a, MIN_ALIGN> {
    /// Adapter over an arena.
    #[inline]
    pub fn new(arena: &'a Arena<'a>) -> Self {
        debug_assert!(MIN_ALIGN.is_power_of_two(), "MIN_ALIGN must be a power of two");
        Self { arena }
    }

    /// Adapter over a checkpointed arena; allocations made through it are
    /// discarded when the checkpoint restores.
    #[inline]
    pub fn from_scratch(scratch: &'a ScratchCheckpoint<'_, 'a>) -> Self {
        Self::new(scratch.arena())
    }

    /// The backing arena
    #[inline]
    pub fn arena(&self) -> &'a Arena<'a> {
        self.arena
    }

    #[inline]
    fn effective_align(layout: Layout) -> usize {
        layout.align().max(MIN_ALIGN)
    }
}

impl<'a, 'b, const A: usize, const B: usize> PartialEq<ArenaAllocator<'b, B>>
    for ArenaAllocator<'a, A>
{
    fn eq(&self, other: &ArenaAllocator<'b, B>) -> bool {
        A == B && self.arena as *const _ as usize == other.arena as *const _ as usize
    }
}

impl<const MIN_ALIGN: usize> Eq for ArenaAllocator<'_, MIN_ALIGN> {}

unsafe impl<const MIN_ALIGN: usize> Allocator for ArenaAllocator<'_, MIN_ALIGN> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = self
            .arena
            .allocate(layout.size(), Self::effective_align(layout))
            .map_err(|_| AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    fn allocate_zeroed(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        // Arena spans are always zero-filled.
        self.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.arena.dealloc(ptr, layout.size());
    }

    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(new_layout.size() >= old_layout.size());

        let align = Self::effective_align(new_layout);
        let grown = if ptr.as_ptr() as usize % align == 0 {
            self.arena
                .resize(Some(ptr), old_layout.size(), new_layout.size(), align)
                .map_err(|_| AllocError)?
        } else {
            // Stricter alignment than the block satisfies: the in-place path
            // would keep a misaligned address, so relocate instead.
            let fresh = self
                .arena
                .allocate(new_layout.size(), align)
                .map_err(|_| AllocError)?;
            ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), old_layout.size());
            fresh
        };
        Ok(NonNull::slice_from_raw_parts(grown, new_layout.size()))
    }

    unsafe fn grow_zeroed(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        // The grown tail is zero-filled by the arena already.
        self.grow(ptr, old_layout, new_layout)
    }

    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(new_layout.size() <= old_layout.size());

        let align = Self::effective_align(new_layout);
        let shrunk = if ptr.as_ptr() as usize % align == 0 {
            self.arena
                .resize(Some(ptr), old_layout.size(), new_layout.size(), align)
                .map_err(|_| AllocError)?
        } else {
            // The new layout may demand stricter alignment than the old one;
            // same guard as grow, relocating the surviving prefix.
            let fresh = self
                .arena
                .allocate(new_layout.size(), align)
                .map_err(|_| AllocError)?;
            ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), new_layout.size());
            fresh
        };
        Ok(NonNull::slice_from_raw_parts(shrunk, new_layout.size()))
    }
}
