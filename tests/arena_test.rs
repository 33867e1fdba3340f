/*!
 * Arena integration tests
 * End-to-end scenarios for bump allocation and scratch checkpoints
 */

use bump_pool::{Arena, ArenaError, ScratchCheckpoint};
use pretty_assertions::assert_eq;

#[repr(align(64))]
struct Aligned<const N: usize>([u8; N]);

#[test]
fn test_sixty_four_byte_scenario() {
    // allocate(40, 8) at offset 0, allocate(24, 8) at offset 40, exactly
    // full; one more byte fails; reset makes the whole arena available.
    let mut buf = Aligned([0u8; 64]);
    let arena = Arena::new(&mut buf.0);
    let base = arena.allocate(40, 8).unwrap();
    let second = arena.allocate(24, 8).unwrap();
    assert_eq!(second.as_ptr() as usize - base.as_ptr() as usize, 40);
    assert_eq!(arena.used(), 64);

    let err = arena.allocate(1, 1).unwrap_err();
    assert!(matches!(err, ArenaError::Exhausted { .. }));

    arena.reset();
    assert!(arena.allocate(64, 8).is_ok());
}

#[test]
fn test_monotonic_bump() {
    let mut buf = [0u8; 2048];
    let arena = Arena::new(&mut buf);

    let mut last = 0;
    for size in [3usize, 17, 1, 64, 128, 5] {
        arena.allocate(size, 8).unwrap();
        assert!(arena.used() >= last, "cursor never moves backwards");
        last = arena.used();
    }

    arena.reset();
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_checkpoint_discards_and_recycles() {
    let mut buf = [0u8; 512];
    let arena = Arena::new(&mut buf);

    let keep = arena.allocate(32, 8).unwrap();
    unsafe { keep.as_ptr().write_bytes(0x55, 32) };
    let saved_used = arena.used();

    let scratch_ptr = {
        let scratch = ScratchCheckpoint::new(&arena);
        let tmp = scratch.allocate(128, 8).unwrap();
        unsafe { tmp.as_ptr().write_bytes(0xEE, 128) };
        tmp
    };

    assert_eq!(arena.used(), saved_used);

    // The discarded bytes are handed out again, zeroed, not 0xEE.
    let reused = arena.allocate(128, 8).unwrap();
    assert_eq!(reused, scratch_ptr);
    let bytes = unsafe { std::slice::from_raw_parts(reused.as_ptr(), 128) };
    assert!(bytes.iter().all(|&b| b == 0));

    // The pre-checkpoint allocation survived untouched.
    let kept = unsafe { std::slice::from_raw_parts(keep.as_ptr(), 32) };
    assert!(kept.iter().all(|&b| b == 0x55));
}

#[test]
fn test_checkpoint_survives_arbitrary_growth() {
    let mut buf = [0u8; 1024];
    let arena = Arena::new(&mut buf);
    arena.allocate(8, 8).unwrap();
    let saved = (arena.previous_offset(), arena.used());

    {
        let scratch = ScratchCheckpoint::new(&arena);
        // Grow, shrink, reallocate: none of it survives the restore.
        let p = scratch.allocate(64, 8).unwrap();
        let p = scratch.resize(Some(p), 64, 256, 8).unwrap();
        scratch.resize(Some(p), 256, 16, 8).unwrap();
        scratch.allocate(100, 1).unwrap();
    }

    assert_eq!((arena.previous_offset(), arena.used()), saved);
}

#[test]
fn test_stale_checkpoint_is_reported() {
    let mut buf = [0u8; 256];
    let arena = Arena::new(&mut buf);
    arena.allocate(64, 8).unwrap();

    let scratch = ScratchCheckpoint::new(&arena);
    arena.reset();

    match scratch.release() {
        Err(ArenaError::StaleCheckpoint {
            saved_generation,
            current_generation,
        }) => {
            assert_eq!(saved_generation, 0);
            assert_eq!(current_generation, 1);
        }
        other => panic!("expected StaleCheckpoint, got {other:?}"),
    }

    // The refused restore left the reset state intact.
    assert!(arena.is_empty());
}

#[test]
fn test_realloc_chain_preserves_contents() {
    let mut buf = [0u8; 4096];
    let arena = Arena::new(&mut buf);

    let mut ptr = arena.allocate(4, 8).unwrap();
    let mut size = 4usize;
    unsafe { ptr.as_ptr().write_bytes(0x11, size) };

    // Interleave foreign allocations so every second resize relocates.
    for step in 0..6 {
        if step % 2 == 1 {
            arena.allocate(16, 8).unwrap();
        }
        let new_size = size * 2;
        ptr = arena.resize(Some(ptr), size, new_size, 8).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), new_size) };
        assert!(bytes[..size].iter().all(|&b| b == 0x11), "step {step}");
        assert!(bytes[size..].iter().all(|&b| b == 0), "step {step}");
        unsafe { ptr.as_ptr().write_bytes(0x11, new_size) };
        size = new_size;
    }
}
