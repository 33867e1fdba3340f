/*!
 * Arena Benchmarks
 *
 * Bump allocation, in-place growth, and pool checkout throughput
 */

use bump_pool::{Arena, ArenaPool, PoolConfig, SizeClass};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");

    for size in [16usize, 64, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut buf = vec![0u8; 16 * 1024 * 1024];
            let arena = Arena::new(&mut buf);
            b.iter(|| {
                if arena.remaining() < size + 16 {
                    arena.reset();
                }
                black_box(arena.allocate(black_box(size), 16).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_grow_in_place(c: &mut Criterion) {
    c.bench_function("grow_in_place", |b| {
        let mut buf = vec![0u8; 16 * 1024 * 1024];
        let arena = Arena::new(&mut buf);
        b.iter(|| {
            arena.reset();
            let mut ptr = arena.allocate(8, 8).unwrap();
            let mut size = 8usize;
            while size < 64 * 1024 {
                ptr = arena.resize(Some(ptr), size, size * 2, 8).unwrap();
                size *= 2;
            }
            black_box(ptr);
        });
    });
}

fn bench_pool_cycle(c: &mut Criterion) {
    let pool = ArenaPool::new(PoolConfig {
        small_count: 16,
        small_size: 64 * 1024,
        medium_count: 8,
        medium_size: 128 * 1024,
        large_count: 4,
        large_size: 256 * 1024,
    });

    c.bench_function("pool_acquire_release", |b| {
        b.iter(|| {
            let handle = pool.acquire(SizeClass::Small).unwrap();
            black_box(handle.allocate(256, 16).unwrap());
        });
    });
}

criterion_group!(benches, bench_allocate, bench_grow_in_place, bench_pool_cycle);
criterion_main!(benches);
