/*!
 * Poison Instrumentation Hooks
 * Injectable poison/unpoison callbacks for sanitizer-style debugging
 */

/// Poison/unpoison hook pair invoked around every arena span transition.
///
/// An arena poisons its whole buffer at construction, poisons spans that are
/// freed (`reset`, checkpoint restore, in-place shrink) and unpoisons exactly
/// the spans handed out by each allocation. The default hooks are no-ops so
/// uninstrumented builds pay nothing; a sanitizer integration (or a test)
/// installs real callbacks at arena construction.
#[derive(Clone, Copy)]
pub struct PoisonHooks {
    /// Marks `len` bytes at `ptr` as off-limits
    pub poison: fn(ptr: *mut u8, len: usize),
    /// Marks `len` bytes at `ptr` as addressable
    pub unpoison: fn(ptr: *mut u8, len: usize),
}

fn noop(_ptr: *mut u8, _len: usize) {}

impl PoisonHooks {
    /// Hook pair that does nothing
    #[inline]
    pub const fn disabled() -> Self {
        Self {
            poison: noop,
            unpoison: noop,
        }
    }
}

impl Default for PoisonHooks {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for PoisonHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoisonHooks").finish_non_exhaustive()
    }
}
