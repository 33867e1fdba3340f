/*!
 * Tiered Arena Memory Subsystem
 *
 * Fixed-capacity bump allocators with checkpoint/restore, a container
 * allocator adapter, and a lock-free pool that circulates preallocated
 * buffers across three size classes.
 *
 * # Components
 *
 * - **Arena**: bump-pointer allocation over one contiguous byte range
 * - **ScratchCheckpoint**: save/restore of an arena's cursor pair for
 *   temporary allocations that vanish in LIFO order
 * - **ArenaAllocator**: `allocator-api2` adapter so generic containers
 *   place their storage inside an arena
 * - **ArenaPool** / **ScopedArenaHandle**: process-wide arbitration of
 *   small/medium/large preallocated buffers via RAII checkout handles
 *
 * # Performance
 *
 * - Allocation: O(1), aligns and bumps a cursor, zero-fills the span
 * - Deallocation: none per object; bulk `reset` or checkpoint restore
 * - Pool checkout: one lock-free queue pop, never blocks
 */

mod adapter;
mod arena;
mod hooks;
mod pool;
mod scratch;
mod types;

pub use adapter::ArenaAllocator;
pub use arena::{align_forward, Arena};
pub use hooks::PoisonHooks;
pub use pool::{ArenaPool, ClassStats, PoolConfig, PoolStats, ScopedArenaHandle};
pub use scratch::ScratchCheckpoint;
pub use types::{ArenaError, ArenaResult, SizeClass};
