//! Benchmarks for dualblur operations.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use dualblur::{plan, CpuBackend, CpuFilter, CpuImage, DualBlur};

/// Gradient test image.
fn gradient(w: u32, h: u32) -> CpuImage {
    let mut img = CpuImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let u = x as f32 / w as f32;
            let v = y as f32 / h as f32;
            img.set_pixel(x, y, [u, v, 1.0 - u, 1.0]);
        }
    }
    img
}

/// Benchmark pass planning.
fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");

    for scale in [1.5f32, 4.0, 37.0, 1000.0].iter() {
        group.bench_with_input(BenchmarkId::new("1920x1080", scale), scale, |b, &s| {
            b.iter(|| plan(black_box(1920), black_box(1080), black_box(s)))
        });
    }

    group.finish();
}

/// Benchmark the full blur on the CPU backend, fade and pre-scale paths.
fn bench_blur(c: &mut Criterion) {
    let mut group = c.benchmark_group("blur");
    group.sample_size(20);

    let mut blur = DualBlur::default();
    blur.configure(2, 512);

    for size in [256u32, 512].iter() {
        let src = gradient(*size, *size);
        group.throughput(Throughput::Elements((*size as u64) * (*size as u64)));

        for radius in [0.5f32, 1.0, 4.0].iter() {
            let id = BenchmarkId::new(format!("r{}", radius), size);
            group.bench_with_input(id, &src, |b, src| {
                // Shared backend: steady-state frames hit the scratch pool
                let mut backend = CpuBackend::new();
                let mut filter = CpuFilter::default();
                let mut dst = src.clone();
                b.iter(|| {
                    blur.blur(&mut backend, Some(&mut filter), src, &mut dst, black_box(*radius))
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_plan, bench_blur);
criterion_main!(benches);
