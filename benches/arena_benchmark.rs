use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use quarry::{Arena, ArenaVec, FromZeroes};
use std::thread;

#[derive(FromZeroes, Clone, Copy, Default)]
#[repr(C)]
struct Struct {
    int: i64,
    float32: f32,
    float64: f64,
    int32: i32,
    int64: i64,
    uint32: u32,
    uint64: u64,
}

const OBJECT_COUNTS: [usize; 3] = [100, 1_000, 10_000];

fn bench_new_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("New Object");

    for count in OBJECT_COUNTS {
        group.bench_with_input(BenchmarkId::new("Box::new", count), &count, |b, &count| {
            b.iter(|| {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(Box::new(Struct::default()));
                }
                black_box(v);
            })
        });

        group.bench_with_input(BenchmarkId::new("Arena", count), &count, |b, &count| {
            let mut arena = Arena::new(32 * 1024 * 1024);
            b.iter(|| {
                {
                    let mut v = Vec::with_capacity(count);
                    for _ in 0..count {
                        v.push(arena.new_object::<Struct>());
                    }
                    black_box(v);
                }
                arena.reset();
            })
        });
    }

    group.finish();
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("Append");

    for count in OBJECT_COUNTS {
        group.bench_with_input(BenchmarkId::new("Vec", count), &count, |b, &count| {
            b.iter(|| {
                let mut v = Vec::with_capacity(16);
                for j in 0..count {
                    v.push(Struct {
                        int: j as i64,
                        ..Struct::default()
                    });
                }
                black_box(v);
            })
        });

        group.bench_with_input(BenchmarkId::new("ArenaVec", count), &count, |b, &count| {
            let mut arena = Arena::new(64 * 1024 * 1024);
            b.iter(|| {
                {
                    let mut v = arena.make_slice::<Struct>(0, 16);
                    for j in 0..count {
                        v.push(Struct {
                            int: j as i64,
                            ..Struct::default()
                        });
                    }
                    black_box(v.len());
                }
                arena.reset();
            })
        });
    }

    group.finish();
}

fn bench_reset(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reset");

    for chunk_size in [64 * 1024, 1024 * 1024, 16 * 1024 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter_batched(
                    || {
                        let arena = Arena::new(chunk_size);
                        arena.alloc_bytes(chunk_size / 2).fill(0xAB);
                        arena
                    },
                    |mut arena| {
                        arena.reset();
                        arena
                    },
                    BatchSize::LargeInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent 4x10000");
    const THREADS: usize = 4;
    const PER_THREAD: usize = 10_000;

    group.bench_function("Arena", |b| {
        let mut arena = Arena::new(1024 * 1024);
        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..THREADS {
                    let arena = &arena;
                    s.spawn(move || {
                        for i in 0..PER_THREAD {
                            black_box(arena.new_value(i as u64));
                        }
                    });
                }
            });
            arena.reset();
        })
    });

    group.bench_function("Box::new", |b| {
        b.iter(|| {
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        let mut v = Vec::with_capacity(PER_THREAD);
                        for i in 0..PER_THREAD {
                            v.push(Box::new(i as u64));
                        }
                        black_box(v);
                    });
                }
            });
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_new_object,
    bench_append,
    bench_reset,
    bench_concurrent
);
criterion_main!(benches);
