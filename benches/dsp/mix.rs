//! Benchmarks for mixing helpers.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_rack::dsp::mix::{accumulate, pan_split, soft_clip};

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin() * 2.0).collect();

        group.bench_with_input(BenchmarkId::new("soft_clip", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    sum += soft_clip(black_box(x));
                }
                sum
            })
        });

        // Eight voices spread across the field
        group.bench_with_input(BenchmarkId::new("pan_8_voices", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = (0.0f32, 0.0f32);
                for &x in &input {
                    for v in 0..8 {
                        let gains = pan_split(black_box(v as f32 / 7.0 * 2.0 - 1.0));
                        accumulate(&mut acc, x, gains);
                    }
                }
                acc
            })
        });
    }

    group.finish();
}
