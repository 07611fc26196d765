//! Benchmarks for the ADSR envelope.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_rack::dsp::envelope::{Adsr, Retrigger};

use crate::BLOCK_SIZES;

const DT: f32 = 1.0 / 48_000.0;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Adsr::adsr(0.1, 0.1, 0.7, 0.3, Retrigger::Pad);
        env.gate_on();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(DT));
            })
        });

        // Sustain phase (holding steady)
        let mut env = Adsr::adsr(0.001, 0.001, 0.7, 0.3, Retrigger::Pad);
        env.gate_on();
        for _ in 0..200 {
            env.process(DT);
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(DT));
            })
        });

        // Release phase (ramping down)
        let mut env = Adsr::adsr(0.001, 0.001, 0.7, 10.0, Retrigger::Pluck);
        env.gate_on();
        for _ in 0..200 {
            env.process(DT);
        }
        env.gate_off();
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(DT));
            })
        });
    }

    group.finish();
}
