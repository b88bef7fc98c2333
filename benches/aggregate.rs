//! Aggregation benchmark suite
//!
//! Summarizing synthetic raw datasets of increasing length, plus the
//! summary rendering that feeds the idempotence check.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sign_bench::aggregate::summarize;
use sign_bench::dataset::render_summary;
use sign_bench::schema::Sample;

fn synthetic_samples(sizes: usize, reps: u32) -> Vec<Sample> {
    let mut out = Vec::with_capacity(sizes * reps as usize);
    for run in 1..=reps {
        for i in 0..sizes {
            let size = 4096u64 << (i % 16);
            let jitter = 1.0 + ((run as f64 * 7.0 + i as f64) % 13.0) / 100.0;
            out.push(Sample::new(size + i as u64, run, 50, 0.05 * jitter));
        }
    }
    out
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");

    for (sizes, reps) in [(9, 3), (64, 10), (512, 50)] {
        let samples = synthetic_samples(sizes, reps);
        group.bench_with_input(
            BenchmarkId::new("rows", samples.len()),
            &samples,
            |b, samples| b.iter(|| summarize(black_box(samples))),
        );
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let rows = summarize(&synthetic_samples(512, 3));
    c.bench_function("render_summary/512", |b| {
        b.iter(|| render_summary(black_box(&rows)))
    });
}

criterion_group!(benches, bench_summarize, bench_render);
criterion_main!(benches);
