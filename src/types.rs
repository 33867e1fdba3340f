/*!
 * Common Types
 * Error taxonomy and size classes shared across the subsystem
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Arena operation result
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Arena and pool errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena exhausted: requested {requested} bytes (align {align}), {remaining} of {capacity} bytes remaining")]
    Exhausted {
        requested: usize,
        align: usize,
        remaining: usize,
        capacity: usize,
    },

    #[error("no free {class} arena: all {total} buffers checked out")]
    PoolExhausted { class: SizeClass, total: usize },

    #[error("pointer 0x{address:x} outside arena range [0x{base:x}, 0x{base:x}+{capacity})")]
    OutOfBounds {
        address: usize,
        base: usize,
        capacity: usize,
    },

    #[error("stale checkpoint: captured at generation {saved_generation}, arena is at {current_generation}")]
    StaleCheckpoint {
        saved_generation: u64,
        current_generation: u64,
    },
}

/// Pool buffer size classes
///
/// Per-class buffer sizes and counts are configured in [`crate::PoolConfig`];
/// the class itself only selects which free list a checkout draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// All classes, in ascending capacity order
    pub const ALL: [SizeClass; 3] = [SizeClass::Small, SizeClass::Medium, SizeClass::Large];

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeClass::Small => write!(f, "small"),
            SizeClass::Medium => write!(f, "medium"),
            SizeClass::Large => write!(f, "large"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ArenaError::Exhausted {
            requested: 128,
            align: 8,
            remaining: 64,
            capacity: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("64 of 1024"));

        let err = ArenaError::PoolExhausted {
            class: SizeClass::Small,
            total: 16,
        };
        assert!(err.to_string().contains("small"));
    }

    #[test]
    fn test_size_class_ordering() {
        assert_eq!(SizeClass::Small.index(), 0);
        assert_eq!(SizeClass::Medium.index(), 1);
        assert_eq!(SizeClass::Large.index(), 2);
    }
}
