//! # Stack Allocator Benchmark
//!
//! Allocate/free throughput for the stack arenas:
//! - LIFO allocate + deallocate pairs
//! - Marker rollback of a whole batch
//! - Linear scratch fill + reset
//!
//! Run with: `cargo bench --package astral_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use astral_core::{NoopGuard, StackAllocator, StackLinearAllocator, TypedStackAllocator};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Block size for the heap-backed arena (1 MB).
const BLOCK_SIZE: usize = 1024 * 1024;

/// Allocations per iteration.
const BATCH: usize = 1_000;

/// Benchmark: allocate then free one block at a time.
fn bench_allocate_deallocate(c: &mut Criterion) {
    let mut stack: StackAllocator<NoopGuard> = StackAllocator::new(BLOCK_SIZE);

    c.bench_function("allocate_deallocate_pair", |b| {
        b.iter(|| {
            let allocation = stack.allocate(black_box(64), 16).unwrap();
            stack.deallocate(allocation);
        });
    });
}

/// Benchmark: fill a batch then release it with a single rollback.
fn bench_rollback(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollback_batch");

    for size in [16, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut stack: StackAllocator<NoopGuard> = StackAllocator::new(BLOCK_SIZE);
            b.iter(|| {
                let marker = stack.marker();
                for _ in 0..BATCH {
                    black_box(stack.allocate(size, 8).unwrap());
                }
                stack.rollback_to_marker(marker);
            });
        });
    }

    group.finish();
}

/// Benchmark: LIFO release of a whole batch, one allocation at a time.
fn bench_lifo_release(c: &mut Criterion) {
    let mut stack: StackAllocator<NoopGuard> = StackAllocator::new(BLOCK_SIZE);
    let mut live = Vec::with_capacity(BATCH);

    c.bench_function("lifo_release_1K", |b| {
        b.iter(|| {
            for _ in 0..BATCH {
                live.push(stack.allocate(48, 8).unwrap());
            }
            while let Some(allocation) = live.pop() {
                stack.deallocate(allocation);
            }
        });
    });
}

/// Benchmark: per-frame scratch fill on the inline linear arena.
fn bench_linear_scratch(c: &mut Criterion) {
    let mut scratch: StackLinearAllocator<4096, NoopGuard> = StackLinearAllocator::new();

    c.bench_function("linear_scratch_frame", |b| {
        b.iter(|| {
            while scratch.allocate(black_box(24), 8).is_ok() {}
            scratch.reset();
        });
    });
}

/// Benchmark: element-typed allocation.
fn bench_typed(c: &mut Criterion) {
    let mut words: TypedStackAllocator<u64, 4096, NoopGuard> = TypedStackAllocator::new();

    c.bench_function("typed_allocate_deallocate", |b| {
        b.iter(|| {
            let batch = words.allocate(black_box(32)).unwrap();
            words.slice_mut(batch).unwrap().fill(7);
            words.deallocate(batch).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_allocate_deallocate,
    bench_rollback,
    bench_lifo_release,
    bench_linear_scratch,
    bench_typed,
);

criterion_main!(benches);
