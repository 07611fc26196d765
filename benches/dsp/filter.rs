//! Benchmarks for the one-pole and biquad filters.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_rack::dsp::filter::{Biquad, RcFilter};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.37).sin()).collect();

        let mut rc = RcFilter::new();
        rc.set_cutoff(2_000.0 / 48_000.0);
        group.bench_with_input(BenchmarkId::new("rc", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    sum += rc.process(black_box(x));
                }
                sum
            })
        });

        let mut biquad = Biquad::lowpass(2_000.0 / 48_000.0, 0.707);
        group.bench_with_input(BenchmarkId::new("biquad", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    sum += biquad.process(black_box(x));
                }
                sum
            })
        });

        // Coefficients recomputed every sample, as modulated cutoffs do
        let mut swept = Biquad::lowpass(0.05, 2.0);
        group.bench_with_input(BenchmarkId::new("biquad_modulated", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for (i, &x) in input.iter().enumerate() {
                    swept.set_lowpass(0.01 + (i as f32 / size as f32) * 0.2, 2.0);
                    sum += swept.process(black_box(x));
                }
                sum
            })
        });
    }

    group.finish();
}
