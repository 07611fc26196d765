//! Benchmarks for waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_rack::dsp::oscillator::{Phase, Waveform};
use saavy_rack::wavetable::{Quality, WavetableInputs, WavetableOscillator, WavetableParams};
use saavy_rack::{Module, ProcessCtx};

use crate::BLOCK_SIZES;

const DT: f32 = 1.0 / 48_000.0;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Naive shapes: sine uses sin(), the rest are branches and ramps
        for waveform in Waveform::ALL {
            let mut phase = Phase::new();
            group.bench_with_input(
                BenchmarkId::new(format!("{waveform:?}").to_lowercase(), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        for out in buffer.iter_mut() {
                            *out = waveform.render(phase.advance(black_box(440.0), DT));
                        }
                    })
                },
            );
        }

        // Mipmapped wavetable, per interpolation quality
        let ctx = ProcessCtx::new(48_000.0);
        let inputs = WavetableInputs {
            pitch: Some(0.75),
            ..Default::default()
        };
        for (name, quality) in [("wavetable_linear", Quality::Medium), ("wavetable_cubic", Quality::High)] {
            let (mut osc, _loader) = WavetableOscillator::new();
            let params = WavetableParams {
                quality,
                ..Default::default()
            };
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for out in buffer.iter_mut() {
                        *out = osc.process(&ctx, &params, black_box(&inputs)).left;
                    }
                })
            });
        }

        // Four-voice unison with a moving frame position
        let (mut osc, _loader) = WavetableOscillator::new();
        let params = WavetableParams {
            unison: 4,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("wavetable_unison4", size), &size, |b, _| {
            b.iter(|| {
                for (i, out) in buffer.iter_mut().enumerate() {
                    let inputs = WavetableInputs {
                        pitch: Some(0.0),
                        wt_x: Some((i as f32 / size as f32) * 10.0),
                        ..Default::default()
                    };
                    *out = osc.process(&ctx, &params, black_box(&inputs)).left;
                }
            })
        });
    }

    group.finish();
}
