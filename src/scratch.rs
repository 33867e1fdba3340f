/*!
 * Scratch Checkpoints
 * Save/restore of an arena's cursor pair for temporary allocations
 */

use crate::arena::Arena;
use crate::types::{ArenaError, ArenaResult};
use log::warn;
use std::mem;
use std::ops::Deref;

/// Snapshot of an arena's cursors, restored on drop.
///
/// Everything allocated through the arena after the checkpoint is taken is
/// discarded when the checkpoint is released: the cursor pair rewinds to the
/// captured values and the bytes become logically uninitialized again (the
/// bump pointer rewinds, nothing is cleared eagerly).
///
/// Checkpoints nest; nested checkpoints must be released in LIFO order.
/// Release order within one generation is a caller contract and is not
/// checked. Restoring after the arena was [`Arena::reset`] *is* detected via
/// the arena's generation counter: [`ScratchCheckpoint::release`] reports
/// [`ArenaError::StaleCheckpoint`] and the drop path refuses to write the
/// stale offsets back.
///
/// The checkpoint derefs to its arena, so temporary allocations read
/// naturally:
///
/// ```
/// use bump_pool::{Arena, ScratchCheckpoint};
///
/// let mut buf = [0u8; 256];
/// let arena = Arena::new(&mut buf);
/// arena.allocate(32, 8).unwrap();
/// let before = arena.used();
///
/// {
///     let scratch = ScratchCheckpoint::new(&arena);
///     scratch.allocate(64, 8).unwrap();
/// } // the 64 temporary bytes vanish here
///
/// assert_eq!(arena.used(), before);
/// ```
#[derive(Debug)]
pub struct ScratchCheckpoint<'a, 'buf> {
    arena: &'a Arena<'buf>,
    prev_offset: usize,
    curr_offset: usize,
    generation: u64,
}

impl<'a, 'buf> ScratchCheckpoint<'a, 'buf> {
    /// Captures the arena's current cursor pair.
    pub fn new(arena: &'a Arena<'buf>) -> Self {
        let (prev_offset, curr_offset) = arena.offsets();
        Self {
            arena,
            prev_offset,
            curr_offset,
            generation: arena.generation(),
        }
    }

    /// The arena this checkpoint belongs to
    #[inline]
    pub fn arena(&self) -> &'a Arena<'buf> {
        self.arena
    }

    /// Explicitly restores the captured cursors.
    ///
    /// Fails with [`ArenaError::StaleCheckpoint`] (leaving the arena
    /// untouched) when the arena was reset after the capture.
    pub fn release(self) -> ArenaResult<()> {
        let result = self.restore();
        mem::forget(self);
        result
    }

    fn restore(&self) -> ArenaResult<()> {
        let current = self.arena.generation();
        if current != self.generation {
            return Err(ArenaError::StaleCheckpoint {
                saved_generation: self.generation,
                current_generation: current,
            });
        }
        self.arena.rewind_to(self.prev_offset, self.curr_offset);
        Ok(())
    }
}

impl<'buf> Deref for ScratchCheckpoint<'_, 'buf> {
    type Target = Arena<'buf>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.arena
    }
}

impl Drop for ScratchCheckpoint<'_, '_> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            debug_assert!(false, "dropped stale scratch checkpoint: {err}");
            warn!("dropped stale scratch checkpoint: {err}");
        }
    }
}
