/*!
 * Tiered Arena Pool
 * Process-wide arbitration of preallocated buffers across size classes
 *
 * # Performance
 *
 * - `acquire`/release: one lock-free bounded-queue operation, never blocks
 * - Backing buffers are allocated once at pool construction and only
 *   circulate between the free lists and active handles afterwards
 *
 * # Concurrency
 *
 * The per-class free lists are the only cross-thread state. A checked-out
 * buffer is exclusively owned by its [`ScopedArenaHandle`]; the handle may
 * move to (and be dropped on) a different thread than the one that acquired
 * it.
 */

use crate::arena::Arena;
use crate::types::{ArenaError, ArenaResult, SizeClass};
use crossbeam_queue::ArrayQueue;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Buffers start on a cache line, which also satisfies every alignment an
/// arena allocation can reasonably request at offset zero.
const BUFFER_ALIGN: usize = 64;

/// Per-class buffer counts and byte sizes.
///
/// The defaults (16 x 16 MiB / 8 x 32 MiB / 4 x 64 MiB) are tuning knobs,
/// not a contract; tests typically construct pools with a couple of tiny
/// buffers per class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub small_count: usize,
    pub small_size: usize,
    pub medium_count: usize,
    pub medium_size: usize,
    pub large_count: usize,
    pub large_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            small_count: 16,
            small_size: 16 * 1024 * 1024,
            medium_count: 8,
            medium_size: 32 * 1024 * 1024,
            large_count: 4,
            large_size: 64 * 1024 * 1024,
        }
    }
}

impl PoolConfig {
    /// (buffer count, buffer size) for a class
    pub fn class(&self, class: SizeClass) -> (usize, usize) {
        match class {
            SizeClass::Small => (self.small_count, self.small_size),
            SizeClass::Medium => (self.medium_count, self.medium_size),
            SizeClass::Large => (self.large_count, self.large_size),
        }
    }

    /// Total backing storage the pool reserves up front
    pub fn total_bytes(&self) -> usize {
        SizeClass::ALL
            .iter()
            .map(|&c| {
                let (count, size) = self.class(c);
                count * size
            })
            .sum()
    }
}

/// Free/in-use counts for one size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStats {
    pub total: usize,
    pub free: usize,
    pub in_use: usize,
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub small: ClassStats,
    pub medium: ClassStats,
    pub large: ClassStats,
}

impl PoolStats {
    /// Stats for one class
    pub fn class(&self, class: SizeClass) -> ClassStats {
        match class {
            SizeClass::Small => self.small,
            SizeClass::Medium => self.medium,
            SizeClass::Large => self.large,
        }
    }
}

/// One registry entry: a raw backing buffer plus its checkout flag.
///
/// Slots are addressed by index, never by pointer, so a stale or duplicated
/// release is detectable instead of being silent pointer arithmetic.
#[derive(Debug)]
struct Slot {
    ptr: NonNull<u8>,
    in_use: AtomicBool,
}

#[derive(Debug)]
struct ClassPool {
    class: SizeClass,
    buf_size: usize,
    slots: Vec<Slot>,
    free: ArrayQueue<u32>,
}

impl ClassPool {
    fn new(class: SizeClass, count: usize, buf_size: usize) -> Self {
        let layout = Self::buffer_layout(buf_size);
        let mut slots = Vec::with_capacity(count);
        let free = ArrayQueue::new(count.max(1));
        for idx in 0..count {
            // SAFETY: layout has non-zero size.
            let raw = unsafe { alloc_zeroed(layout) };
            let Some(ptr) = NonNull::new(raw) else {
                handle_alloc_error(layout)
            };
            slots.push(Slot {
                ptr,
                in_use: AtomicBool::new(false),
            });
            // Queue capacity equals the slot count; this cannot fail.
            let _ = free.push(idx as u32);
        }
        Self {
            class,
            buf_size,
            slots,
            free,
        }
    }

    fn buffer_layout(buf_size: usize) -> Layout {
        // A zero or near-isize::MAX size is a configuration bug worth dying
        // loudly for.
        assert!(buf_size > 0, "arena buffer size must be non-zero");
        Layout::from_size_align(buf_size, BUFFER_ALIGN)
            .unwrap_or_else(|_| panic!("invalid arena buffer size {buf_size}"))
    }

    fn stats(&self) -> ClassStats {
        // Counted from the per-slot flags, not derived from the free list, so
        // a slot that leaked out of both (or into both) shows up in the
        // numbers instead of being defined away.
        let in_use = self
            .slots
            .iter()
            .filter(|slot| slot.in_use.load(Ordering::Acquire))
            .count();
        ClassStats {
            total: self.slots.len(),
            free: self.free.len(),
            in_use,
        }
    }
}

impl Drop for ClassPool {
    fn drop(&mut self) {
        let layout = Self::buffer_layout(self.buf_size);
        for slot in &self.slots {
            // SAFETY: allocated in ClassPool::new with the same layout.
            unsafe { dealloc(slot.ptr.as_ptr(), layout) };
        }
    }
}

#[derive(Debug)]
struct PoolInner {
    classes: [ClassPool; 3],
    config: PoolConfig,
}

// SAFETY: slot buffers are only reachable through the atomic free lists and
// the per-slot in_use flags; a buffer's contents are touched exclusively by
// the single handle that holds its index.
unsafe impl Send for PoolInner {}
unsafe impl Sync for PoolInner {}

/// Tiered pool of preallocated arena buffers.
///
/// Cloning is cheap and shares the underlying pool; the backing storage is
/// freed when the last clone (and every outstanding handle, which holds a
/// clone) is gone. Construct one explicitly and pass it to the subsystems
/// that need arenas, or use [`ArenaPool::global`] for the process-wide
/// default.
///
/// ```
/// use bump_pool::{ArenaPool, PoolConfig, SizeClass};
///
/// let pool = ArenaPool::new(PoolConfig {
///     small_count: 2,
///     small_size: 4096,
///     medium_count: 1,
///     medium_size: 8192,
///     large_count: 1,
///     large_size: 16384,
/// });
///
/// let frame = pool.acquire(SizeClass::Small).unwrap();
/// let ptr = frame.allocate(256, 16).unwrap();
/// assert!(frame.contains(ptr));
/// drop(frame); // buffer returns to the small free list
/// ```
#[derive(Debug, Clone)]
pub struct ArenaPool {
    inner: Arc<PoolInner>,
}

impl ArenaPool {
    /// Builds a pool, reserving and zeroing all backing buffers up front.
    ///
    /// # Panics
    ///
    /// Panics if a configured buffer size is zero or overflows a layout.
    pub fn new(config: PoolConfig) -> Self {
        let classes = SizeClass::ALL.map(|class| {
            let (count, size) = config.class(class);
            ClassPool::new(class, count, size)
        });
        let buffers: usize = classes.iter().map(|c| c.slots.len()).sum();
        info!(
            "arena pool initialized: {} buffers, {} bytes reserved",
            buffers,
            config.total_bytes()
        );
        Self {
            inner: Arc::new(PoolInner { classes, config }),
        }
    }

    /// Lazily-constructed process-wide pool with the default configuration.
    ///
    /// Prefer constructing pools explicitly where substitutability matters
    /// (tests use tiny configurations); this exists for consumers without a
    /// natural injection point.
    pub fn global() -> &'static ArenaPool {
        static GLOBAL: OnceLock<ArenaPool> = OnceLock::new();
        GLOBAL.get_or_init(|| ArenaPool::new(PoolConfig::default()))
    }

    /// The configuration this pool was built with
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Checks out one buffer of the class as a scoped arena.
    ///
    /// Non-blocking: an empty free list reports
    /// [`ArenaError::PoolExhausted`] immediately. Callers degrade (skip the
    /// job, drop the frame) rather than wait; exhaustion under a correctly
    /// sized configuration is a capacity-planning bug and is logged as such.
    pub fn acquire(&self, class: SizeClass) -> ArenaResult<ScopedArenaHandle> {
        let pool = &self.inner.classes[class.index()];
        let Some(slot) = pool.free.pop() else {
            warn!(
                "{} arena pool exhausted: all {} buffers checked out",
                class,
                pool.slots.len()
            );
            return Err(ArenaError::PoolExhausted {
                class,
                total: pool.slots.len(),
            });
        };

        let entry = &pool.slots[slot as usize];
        let already = entry.in_use.swap(true, Ordering::AcqRel);
        debug_assert!(!already, "free list handed out a checked-out slot");

        // SAFETY: the slot index was popped from the free list, so this
        // handle is the buffer's only owner until it is released; the
        // buffer outlives the handle because the handle keeps the pool
        // alive.
        let arena = unsafe { Arena::from_raw_parts(entry.ptr, pool.buf_size) };
        Ok(ScopedArenaHandle {
            arena,
            class,
            slot,
            pool: self.clone(),
        })
    }

    /// Convenience checkout of a small arena
    #[inline]
    pub fn acquire_small(&self) -> ArenaResult<ScopedArenaHandle> {
        self.acquire(SizeClass::Small)
    }

    /// Convenience checkout of a medium arena
    #[inline]
    pub fn acquire_medium(&self) -> ArenaResult<ScopedArenaHandle> {
        self.acquire(SizeClass::Medium)
    }

    /// Convenience checkout of a large arena
    #[inline]
    pub fn acquire_large(&self) -> ArenaResult<ScopedArenaHandle> {
        self.acquire(SizeClass::Large)
    }

    /// Occupancy snapshot.
    ///
    /// Per class, `free + in_use <= total`: a buffer mid-handoff (popped but
    /// not yet flagged, or unflagged but not yet pushed back) is counted in
    /// neither column for that instant. At quiescence the sum is exactly
    /// `total`; a sum above `total` means a slot was issued or released
    /// twice.
    pub fn stats(&self) -> PoolStats {
        let [small, medium, large] = &self.inner.classes;
        PoolStats {
            small: small.stats(),
            medium: medium.stats(),
            large: large.stats(),
        }
    }

    fn release(&self, class: SizeClass, slot: u32) {
        let pool = &self.inner.classes[class.index()];
        let entry = &pool.slots[slot as usize];
        let was_in_use = entry.in_use.swap(false, Ordering::AcqRel);
        if !was_in_use {
            debug_assert!(false, "double release of {} arena slot {slot}", pool.class);
            warn!("double release of {} arena slot {slot} ignored", pool.class);
            return;
        }
        if pool.free.push(slot).is_err() {
            // Unreachable while the in_use flags hold: the queue is sized
            // for every slot.
            warn!("{} arena free list full, slot {slot} dropped", pool.class);
        }
    }
}

/// RAII checkout of one pool buffer, viewed as an [`Arena`].
///
/// Dereferences to the arena. Dropping the handle returns the buffer to its
/// class's free list exactly once, however much of the arena was used; a
/// handle that was moved elsewhere simply drops there (moves never
/// double-release). The handle may be sent to another thread; the arena
/// inside remains single-thread-at-a-time by construction.
#[derive(Debug)]
pub struct ScopedArenaHandle {
    arena: Arena<'static>,
    class: SizeClass,
    slot: u32,
    pool: ArenaPool,
}

impl ScopedArenaHandle {
    /// The size class this buffer came from
    #[inline]
    pub fn class(&self) -> SizeClass {
        self.class
    }

    /// The arena view over the checked-out buffer
    #[inline]
    pub fn arena(&self) -> &Arena<'static> {
        &self.arena
    }
}

impl Deref for ScopedArenaHandle {
    type Target = Arena<'static>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.arena
    }
}

impl DerefMut for ScopedArenaHandle {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.arena
    }
}

impl Drop for ScopedArenaHandle {
    fn drop(&mut self) {
        self.pool.release(self.class, self.slot);
    }
}
