//! Benchmarks for the comb reverb.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_rack::dsp::reverb::SimpleReverb;

use crate::BLOCK_SIZES;

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin() * 0.5).collect();

        for &feedback in &[0.35f32, 0.7] {
            let mut reverb = SimpleReverb::new(48_000.0);
            reverb.set_feedback(feedback);
            group.bench_with_input(
                BenchmarkId::new(format!("combs_fb{}", (feedback * 100.0) as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let mut sum = 0.0f32;
                        for &x in &input {
                            sum += reverb.process(black_box(x));
                        }
                        sum
                    })
                },
            );
        }
    }

    group.finish();
}
