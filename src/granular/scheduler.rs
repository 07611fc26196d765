//! Grain spawning against a beat clock.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::grain::{Grain, GrainSource};
use crate::dsp::trigger::SchmittTrigger;

/// Grains that may sound at once.
pub const MAX_GRAINS: usize = 32;

/// Spawn slots per beat at full density are `1 + DENSITY_SLOTS`.
pub const DENSITY_SLOTS: f32 = 12.0;

/// Where grains start, relative to the source length.
const BASE_OFFSET: f32 = 0.1;
/// Jitter span at full vitality, relative to the source length.
const JITTER_SPAN: f32 = 0.4;

/// Per-sample spawn settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainSettings {
    pub bpm: f32,
    /// Spawn probability per slot, also sets how many slots a beat has
    pub density: f32,
    /// Grain length, seconds
    pub size: f32,
    /// Playback rate
    pub rate: f32,
    /// Start-position jitter amount
    pub vitality: f32,
}

impl Default for GrainSettings {
    fn default() -> Self {
        Self {
            bpm: 88.0,
            density: 0.4,
            size: 0.12,
            rate: 1.0,
            vitality: 0.3,
        }
    }
}

impl GrainSettings {
    /// Seconds between spawn slots.
    pub fn interval(&self) -> f32 {
        let beat = 60.0 / self.bpm.max(1.0);
        beat / (1.0 + self.density.clamp(0.0, 1.0) * DENSITY_SLOTS)
    }
}

/// Fixed pool of grains plus the timer that feeds it.
///
/// Each slot of the beat grid spawns a grain with probability `density`. A
/// clock edge restarts the grid and always spawns. When every grain is busy
/// the spawn is dropped.
#[derive(Debug, Clone)]
pub struct GrainScheduler<const POOL_SIZE: usize = MAX_GRAINS> {
    grains: [Grain; POOL_SIZE],
    timer: f32,
    clock: SchmittTrigger,
    rng: SmallRng,
}

impl<const POOL_SIZE: usize> Default for GrainScheduler<POOL_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const POOL_SIZE: usize> GrainScheduler<POOL_SIZE> {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            grains: [Grain::new(); POOL_SIZE],
            timer: 0.0,
            clock: SchmittTrigger::default(),
            rng,
        }
    }

    pub fn active_grains(&self) -> usize {
        self.grains.iter().filter(|g| g.is_active()).count()
    }

    pub fn grains(&self) -> &[Grain] {
        &self.grains
    }

    /// Start a grain on the first free slot. False if the pool is full or
    /// the source is empty.
    pub fn spawn(&mut self, source: &GrainSource, settings: &GrainSettings) -> bool {
        if source.is_empty() {
            return false;
        }
        let Some(grain) = self.grains.iter_mut().find(|g| !g.is_active()) else {
            return false;
        };

        let length = source.duration();
        let size = settings.size;
        let jitter = settings.vitality.clamp(0.0, 1.0) * length * JITTER_SPAN;
        let start = BASE_OFFSET * length + (self.rng.random::<f32>() - 0.5) * jitter;
        let start = start.clamp(0.0, (length - size).max(0.0));

        grain.activate(start * source.sample_rate(), size, settings.rate);
        true
    }

    /// Advance one sample and return the summed grain output.
    ///
    /// `clock` is the external clock voltage, `None` when unpatched.
    #[inline]
    pub fn process(
        &mut self,
        source: &GrainSource,
        settings: &GrainSettings,
        clock: Option<f32>,
        dt: f32,
    ) -> f32 {
        if let Some(v) = clock {
            if self.clock.process(v) {
                self.timer = 0.0;
                self.spawn(source, settings);
            }
        }

        let interval = settings.interval();
        let density = settings.density.clamp(0.0, 1.0);
        self.timer += dt;
        while self.timer >= interval {
            self.timer -= interval;
            if self.rng.random::<f32>() < density {
                self.spawn(source, settings);
            }
        }

        let mut sum = 0.0;
        for grain in &mut self.grains {
            sum += grain.process(source, dt);
        }
        sum
    }

    pub fn reset(&mut self) {
        for grain in &mut self.grains {
            grain.deactivate();
        }
        self.timer = 0.0;
        self.clock.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 1_000.0;

    #[test]
    fn zero_density_never_spawns() {
        let source = GrainSource::synthesized(1_000.0);
        let mut sched = GrainScheduler::<MAX_GRAINS>::with_seed(1);
        let settings = GrainSettings {
            density: 0.0,
            ..Default::default()
        };
        for _ in 0..10_000 {
            assert_eq!(sched.process(&source, &settings, None, DT), 0.0);
            assert_eq!(sched.active_grains(), 0);
        }
    }

    #[test]
    fn full_density_fills_every_slot() {
        let source = GrainSource::synthesized(1_000.0);
        let mut sched = GrainScheduler::<MAX_GRAINS>::with_seed(1);
        // 60 BPM, 13 slots per beat; grains long enough to overlap
        let settings = GrainSettings {
            bpm: 60.0,
            density: 1.0,
            size: 0.5,
            vitality: 0.0,
            ..Default::default()
        };
        for _ in 0..1_000 {
            sched.process(&source, &settings, None, DT);
        }
        assert!((6..=8).contains(&sched.active_grains()), "{}", sched.active_grains());
    }

    #[test]
    fn clock_edge_always_spawns() {
        let source = GrainSource::synthesized(1_000.0);
        let mut sched = GrainScheduler::<MAX_GRAINS>::with_seed(1);
        let settings = GrainSettings {
            density: 0.0,
            ..Default::default()
        };
        sched.process(&source, &settings, Some(0.0), DT);
        sched.process(&source, &settings, Some(5.0), DT);
        assert_eq!(sched.active_grains(), 1);
        sched.process(&source, &settings, Some(5.0), DT);
        assert_eq!(sched.active_grains(), 1);
    }

    #[test]
    fn full_pool_drops_spawns() {
        let source = GrainSource::synthesized(1_000.0);
        let mut sched = GrainScheduler::<4>::with_seed(1);
        let settings = GrainSettings {
            size: 0.5,
            ..Default::default()
        };
        for _ in 0..4 {
            assert!(sched.spawn(&source, &settings));
        }
        assert!(!sched.spawn(&source, &settings));
        assert_eq!(sched.active_grains(), 4);
    }

    #[test]
    fn start_positions_stay_inside_the_source() {
        let source = GrainSource::synthesized(1_000.0);
        let mut sched = GrainScheduler::<MAX_GRAINS>::with_seed(3);
        let settings = GrainSettings {
            size: 0.2,
            vitality: 1.0,
            ..Default::default()
        };
        for _ in 0..MAX_GRAINS {
            sched.spawn(&source, &settings);
        }
        let limit = (source.duration() - 0.2) * source.sample_rate();
        for grain in sched.grains() {
            assert!(grain.position() >= 0.0 && grain.position() <= limit + 1e-3);
        }
        // Jitter spreads them: 0.2 s ± 0.4 s before clamping
        let distinct = sched
            .grains()
            .iter()
            .map(|g| g.position() as i32)
            .collect::<std::collections::BTreeSet<_>>();
        assert!(distinct.len() > 10);
    }

    #[test]
    fn empty_source_is_ignored() {
        let mut sched = GrainScheduler::<MAX_GRAINS>::with_seed(1);
        assert!(!sched.spawn(&GrainSource::default(), &GrainSettings::default()));
    }
}
