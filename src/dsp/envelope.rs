use crate::MIN_TIME;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
ADSR Envelope
=============

A linear ADSR envelope: the gain multiplier behind every chord, pad and pluck
voice in the crate.

Vocabulary
----------

  level       The envelope's output (0.0 to 1.0), multiplied into the voice.

  stage       Idle, Attack, Decay, Sustain or Release. A small state machine
              governs transitions.

  gate        Note held (on) or released (off). Hosts deliver gate edges, not
              levels: `gate_on` once per rising edge, `gate_off` once per
              falling edge.

  rate        How far `level` moves per second in a ramp stage: 1/attack,
              1/decay, 1/release. Per sample the step is dt * rate.


The Shape
---------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

Each ramp moves at a FIXED rate, so decay from 1.0 to a low sustain takes
longer than decay to a high one, and a release started mid-attack finishes
sooner than one started from 1.0.


The State Machine
-----------------

    ┌──────┐  gate_on   ┌────────┐  level=1   ┌───────┐
    │ Idle │ ─────────→ │ Attack │ ─────────→ │ Decay │
    └──────┘            └────────┘            └───────┘
        ↑                    │ gate_off           │ level=S
        │                    ↓                    ↓
        │  level=0     ┌─────────┐  gate_off  ┌─────────┐
        └───────────── │ Release │ ←───────── │ Sustain │
                       └─────────┘            └─────────┘

gate_off from Attack or Decay also goes straight to Release. Release always
starts from the CURRENT level.


Retrigger Policies
------------------

What gate_on does while the envelope is already running is a musical choice,
so it is a named policy rather than a flag:

  Pad     gate_on only starts a new Attack from Idle or Release, and the
          attack resumes from the current level. A held chord that receives
          another gate keeps sounding without a click.

  Pluck   gate_on ALWAYS resets to (Attack, 0.0). Every step of an arpeggio
          gets a fresh transient, at the cost of a hard edge when a note is
          cut off mid-decay.

Times are clamped to MIN_TIME (1ms) so no rate ever divides by zero.
*/

/// The current stage of the envelope state machine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,    // Gate low, level = 0
    Attack,  // Ramping up to 1.0
    Decay,   // Ramping down to sustain
    Sustain, // Holding at sustain while gate is high
    Release, // Gate went low, ramping down to 0
}

/// How `gate_on` behaves while the envelope is already active.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retrigger {
    /// Restart only from Idle or Release, continuing from the current level
    #[default]
    Pad,
    /// Always restart at (Attack, 0)
    Pluck,
}

#[derive(Debug, Clone)]
pub struct Adsr {
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    retrigger: Retrigger,

    stage: EnvelopeState,
    level: f32,
}

impl Default for Adsr {
    fn default() -> Self {
        Self::new(Retrigger::Pad)
    }
}

impl Adsr {
    pub fn new(retrigger: Retrigger) -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.2,
            retrigger,
            stage: EnvelopeState::Idle,
            level: 0.0,
        }
    }

    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32, retrigger: Retrigger) -> Self {
        let mut env = Self::new(retrigger);
        env.set_times(attack, decay, sustain, release);
        env
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = seconds.max(MIN_TIME);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = seconds.max(MIN_TIME);
    }

    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release = seconds.max(MIN_TIME);
    }

    pub fn set_times(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.set_attack(attack);
        self.set_decay(decay);
        self.set_sustain(sustain);
        self.set_release(release);
    }

    /// Gate rising edge.
    pub fn gate_on(&mut self) {
        match self.retrigger {
            Retrigger::Pad => {
                if matches!(self.stage, EnvelopeState::Idle | EnvelopeState::Release) {
                    self.stage = EnvelopeState::Attack;
                }
            }
            Retrigger::Pluck => {
                self.stage = EnvelopeState::Attack;
                self.level = 0.0;
            }
        }
    }

    /// Gate falling edge.
    pub fn gate_off(&mut self) {
        if matches!(
            self.stage,
            EnvelopeState::Attack | EnvelopeState::Decay | EnvelopeState::Sustain
        ) {
            self.stage = EnvelopeState::Release;
        }
    }

    pub fn gate(&mut self, on: bool) {
        if on {
            self.gate_on();
        } else {
            self.gate_off();
        }
    }

    /// Advance by one sample of `dt` seconds and return the new level.
    pub fn process(&mut self, dt: f32) -> f32 {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level += dt / self.attack;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                self.level -= dt / self.decay;
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain;
            }

            EnvelopeState::Release => {
                self.level -= dt / self.release;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32], dt: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.process(dt);
        }
    }

    /// Returns true if the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeState::Idle)
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }

    pub fn retrigger(&self) -> Retrigger {
        self.retrigger
    }

    pub fn sustain(&self) -> f32 {
        self.sustain
    }
}
