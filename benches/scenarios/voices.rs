//! Benchmarks for the voice pool and chord voicing.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_rack::dsp::oscillator::Waveform;
use saavy_rack::module::{midi_to_freq, GATE_HIGH};
use saavy_rack::synth::chord_synth::{ChordSynthInputs, ChordSynthParams};
use saavy_rack::synth::{ChordSynth, ChordType, VoicePool, Voicing};
use saavy_rack::{Module, ProcessCtx};

use crate::BLOCK_SIZES;

const DT: f32 = 1.0 / 48_000.0;

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let ctx = ProcessCtx::new(48_000.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === FULL POOL ===
        // Sixteen sustained voices, the ambient synth's worst case
        let mut pool = VoicePool::new(16);
        for i in 0..16 {
            pool.note_on(midi_to_freq(48.0 + i as f32 * 3.0), Waveform::ALL[i % 4]);
        }
        group.bench_with_input(BenchmarkId::new("pool_16", size), &size, |b, _| {
            b.iter(|| {
                for out in buffer.iter_mut() {
                    *out = pool.render(black_box(DT));
                }
            })
        });

        // === CHORD SYNTH ===
        // Seventh chord, spread voicing, filter and LFO running
        let mut synth = ChordSynth::with_seed(7);
        let params = ChordSynthParams {
            chord: ChordType::Seventh,
            voices: 4,
            voicing: Voicing::Spread,
            waveform: Waveform::Saw,
            cutoff: 2_000.0,
            resonance: 0.5,
            motion: 0.5,
            mod_cutoff: 0.5,
            ..Default::default()
        };
        let inputs = ChordSynthInputs {
            pitch: Some(0.0),
            gate: GATE_HIGH,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("chord_synth", size), &size, |b, _| {
            b.iter(|| {
                for out in buffer.iter_mut() {
                    *out = synth.process(&ctx, &params, black_box(&inputs)).left;
                }
            })
        });
    }

    group.finish();
}
