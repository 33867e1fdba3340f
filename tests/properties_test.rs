/*!
 * Property tests
 * Alignment, monotonic bump, and non-overlap over generated workloads
 */

use bump_pool::{Arena, ScratchCheckpoint};
use proptest::prelude::*;

const CAPACITY: usize = 8192;

fn requests() -> impl Strategy<Value = Vec<(usize, usize)>> {
    // (size, align) pairs; align is any power of two up to 128.
    prop::collection::vec((0usize..256, 0u32..8).prop_map(|(s, e)| (s, 1usize << e)), 1..64)
}

proptest! {
    #[test]
    fn prop_alignment(reqs in requests()) {
        let mut buf = vec![0u8; CAPACITY];
        let arena = Arena::new(&mut buf);

        for (size, align) in reqs {
            if let Ok(ptr) = arena.allocate(size, align) {
                prop_assert_eq!(ptr.as_ptr() as usize % align, 0);
            }
        }
    }

    #[test]
    fn prop_monotonic_bump(reqs in requests()) {
        let mut buf = vec![0u8; CAPACITY];
        let arena = Arena::new(&mut buf);

        let mut last = arena.used();
        for (size, align) in reqs {
            let before = arena.used();
            match arena.allocate(size, align) {
                Ok(_) => {
                    prop_assert!(arena.used() >= last);
                    last = arena.used();
                }
                // Failed allocations never mutate state.
                Err(_) => prop_assert_eq!(arena.used(), before),
            }
        }
    }

    #[test]
    fn prop_no_overlap(reqs in requests()) {
        let mut buf = vec![0u8; CAPACITY];
        let arena = Arena::new(&mut buf);

        let mut spans: Vec<(usize, usize)> = Vec::new();
        for (size, align) in reqs {
            if size == 0 {
                continue;
            }
            if let Ok(ptr) = arena.allocate(size, align) {
                spans.push((ptr.as_ptr() as usize, size));
            }
        }

        for (i, &(a, sa)) in spans.iter().enumerate() {
            for &(b, sb) in &spans[i + 1..] {
                prop_assert!(a + sa <= b || b + sb <= a, "spans overlap");
            }
        }
    }

    #[test]
    fn prop_checkpoint_round_trip(head in requests(), scratch_reqs in requests()) {
        let mut buf = vec![0u8; CAPACITY];
        let arena = Arena::new(&mut buf);

        for (size, align) in head {
            let _ = arena.allocate(size, align);
        }
        let saved = (arena.previous_offset(), arena.used());

        {
            let scratch = ScratchCheckpoint::new(&arena);
            for (size, align) in scratch_reqs {
                let _ = scratch.allocate(size, align);
            }
        }

        prop_assert_eq!((arena.previous_offset(), arena.used()), saved);
    }

    #[test]
    fn prop_zero_fill(size in 1usize..512, align_exp in 0u32..8) {
        let mut buf = vec![0xFFu8; CAPACITY];
        let arena = Arena::new(&mut buf);

        // Dirty the buffer, rewind, and check the next span reads zero.
        let ptr = arena.allocate(CAPACITY / 2, 1).unwrap();
        unsafe { ptr.as_ptr().write_bytes(0xAB, CAPACITY / 2) };
        arena.reset();

        let ptr = arena.allocate(size, 1 << align_exp).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), size) };
        prop_assert!(bytes.iter().all(|&b| b == 0));
    }
}
