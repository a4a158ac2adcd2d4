//! Allocator benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use mason_alloc::{LinearAllocator, TlsfAllocator};

fn bench_tlsf_alloc_free_cycle(c: &mut Criterion) {
    let sizes: &[u64] = &[16, 64, 256, 1024, 4096, 32768];
    let mut group = c.benchmark_group("tlsf_alloc_free_cycle");

    for &size in sizes {
        group.bench_with_input(BenchmarkId::new("tlsf", size), &size, |b, &sz| {
            let mut tlsf = TlsfAllocator::new(1 << 24, 1024).unwrap();
            b.iter(|| {
                let id = tlsf.allocate(sz, 8).unwrap();
                tlsf.free(id).unwrap();
                criterion::black_box(id);
            });
        });
    }
    group.finish();
}

fn bench_tlsf_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("tlsf_burst");

    group.bench_function("1000x64B_forward_free", |b| {
        let mut tlsf = TlsfAllocator::new(1 << 24, 2048).unwrap();
        b.iter(|| {
            let ids: Vec<_> = (0..1000).map(|_| tlsf.allocate(64, 8).unwrap()).collect();
            for id in ids {
                tlsf.free(id).unwrap();
            }
        });
    });

    group.bench_function("1000x64B_reverse_free", |b| {
        let mut tlsf = TlsfAllocator::new(1 << 24, 2048).unwrap();
        b.iter(|| {
            let ids: Vec<_> = (0..1000).map(|_| tlsf.allocate(64, 8).unwrap()).collect();
            for id in ids.into_iter().rev() {
                tlsf.free(id).unwrap();
            }
        });
    });

    group.finish();
}

fn bench_linear_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_baseline");

    group.bench_function("1000x64B_bump_reset", |b| {
        let mut linear = LinearAllocator::new(1 << 20);
        b.iter(|| {
            for _ in 0..1000 {
                criterion::black_box(linear.allocate(64, 8).unwrap());
            }
            linear.reset();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tlsf_alloc_free_cycle,
    bench_tlsf_burst,
    bench_linear_baseline
);
criterion_main!(benches);
