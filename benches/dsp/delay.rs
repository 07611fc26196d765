//! Benchmarks for delay line operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_rack::dsp::delay::{feedback_tap, DelayLine};

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    // Test with different delay times (in samples)
    let delay_times: &[usize] = &[
        480,    // 10ms at 48kHz
        4800,   // 100ms at 48kHz
        48000,  // 1 second at 48kHz
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        for &delay_samples in delay_times {
            let delay_ms = delay_samples as f32 / 48.0;

            // Echo with feedback, as the stereo effects run it
            let mut line = DelayLine::with_duration(1.0, 48_000.0);
            group.bench_with_input(
                BenchmarkId::new(format!("feedback_{}ms", delay_ms as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let mut sum = 0.0f32;
                        for &x in &input {
                            sum += feedback_tap(&mut line, black_box(x), black_box(delay_samples), 0.5);
                        }
                        sum
                    })
                },
            );
        }

        // Plain write/read, the looper's capture path
        let mut line = DelayLine::with_duration(2.5, 48_000.0);
        group.bench_with_input(BenchmarkId::new("push_read", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    line.push(black_box(x));
                    sum += line.read(black_box(1_000));
                }
                sum
            })
        });
    }

    group.finish();
}
