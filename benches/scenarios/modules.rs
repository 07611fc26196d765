//! Benchmarks for complete modules under heavy settings.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_rack::effects::{StereoFx, StereoFxInputs, StereoFxParams};
use saavy_rack::granular::{ParticleInputs, ParticleParams, ParticleSynth};
use saavy_rack::looper::{BuildupLooper, LooperInputs, LooperParams};
use saavy_rack::synth::ambient::{AmbientInputs, AmbientParams};
use saavy_rack::synth::AmbientSynth;
use saavy_rack::{Module, ProcessCtx};

use crate::BLOCK_SIZES;

pub fn bench_modules(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/modules");
    let ctx = ProcessCtx::new(48_000.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === GRANULAR ===
        // Full density with long grains keeps most of the pool busy
        let (mut particle, _loader) = ParticleSynth::with_seed(3);
        let params = ParticleParams {
            density: 1.0,
            grain_size: 0.4,
            vitality: 0.8,
            ..Default::default()
        };
        for _ in 0..48_000 {
            particle.process(&ctx, &params, &ParticleInputs::default());
        }
        group.bench_with_input(BenchmarkId::new("particle", size), &size, |b, _| {
            b.iter(|| {
                for out in buffer.iter_mut() {
                    *out = particle.process(&ctx, &params, black_box(&ParticleInputs::default())).left;
                }
            })
        });

        // === LOOPER ===
        // Mid build-up: fractional playhead plus seam crossfade
        let mut looper = BuildupLooper::new();
        let mut params = LooperParams {
            intensity: 8.0,
            time: 2.0,
            ..Default::default()
        };
        looper.settle(&params);
        let live = |i: usize| LooperInputs {
            left: Some((i as f32 * 0.05).sin() * 5.0),
            ..Default::default()
        };
        for i in 0..24_000 {
            looper.process(&ctx, &params, &live(i));
        }
        params.build = true;
        for i in 0..48_000 {
            looper.process(&ctx, &params, &live(i));
        }
        group.bench_with_input(BenchmarkId::new("looper_build", size), &size, |b, _| {
            b.iter(|| {
                for (i, out) in buffer.iter_mut().enumerate() {
                    *out = looper.process(&ctx, &params, black_box(&live(i))).left;
                }
            })
        });

        // === STEREO FX ===
        // Every stage enabled
        let mut fx = StereoFx::new();
        let params = StereoFxParams {
            delay: true,
            reverb: true,
            echo: true,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("stereo_fx", size), &size, |b, _| {
            b.iter(|| {
                for (i, out) in buffer.iter_mut().enumerate() {
                    let x = (i as f32 * 0.05).sin() * 5.0;
                    let inputs = StereoFxInputs {
                        left: Some(x),
                        right: Some(-x),
                    };
                    *out = fx.process(&ctx, &params, black_box(&inputs)).left;
                }
            })
        });

        // === AMBIENT ===
        // Dense generative patch with the cross-feedback delay running
        let mut ambient = AmbientSynth::with_seed(5);
        let params = AmbientParams {
            tempo: 240.0,
            density: 1.0,
            ..Default::default()
        };
        for _ in 0..96_000 {
            ambient.process(&ctx, &params, &AmbientInputs::default());
        }
        group.bench_with_input(BenchmarkId::new("ambient", size), &size, |b, _| {
            b.iter(|| {
                for out in buffer.iter_mut() {
                    *out = ambient.process(&ctx, &params, black_box(&AmbientInputs::default())).left;
                }
            })
        });
    }

    group.finish();
}
