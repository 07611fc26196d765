//! Off-thread bank replacement.
//!
//! [`WavetableBanks`] lives on the audio thread next to the oscillator.
//! [`BankLoader`] is handed to whichever thread decodes files. A load builds
//! the whole replacement table (resample, normalize, mips) on the loader's
//! thread, then publishes it; the audio side installs it between samples.

use std::path::Path;

use log::{info, warn};

use super::table::{Wavetable, NUM_BANKS};
use crate::error::{LoadError, LoadResult};
use crate::handoff::{self, Publisher, Receiver};
use crate::io::{self, DecodedSample};

/// Replacements that may be queued before the audio side drains them.
const IN_FLIGHT: usize = 4;

/// Audio-side owner of the installed banks.
pub struct WavetableBanks {
    banks: Vec<Box<Wavetable>>,
    receiver: Receiver<Wavetable>,
}

/// Loader-side handle that builds and publishes replacement banks.
pub struct BankLoader {
    publisher: Publisher<Wavetable>,
}

impl WavetableBanks {
    /// Synthesize the default banks and connect a loader to them.
    pub fn new() -> (Self, BankLoader) {
        let banks = (0..NUM_BANKS)
            .map(|bank| Box::new(Wavetable::default_bank(bank)))
            .collect();
        let (publisher, receiver) = handoff::channel(IN_FLIGHT);
        (Self { banks, receiver }, BankLoader { publisher })
    }

    /// Install at most one pending bank. Realtime-safe.
    #[inline]
    pub fn poll(&mut self) -> Option<usize> {
        self.receiver.poll(&mut self.banks)
    }

    /// False while a load is in progress; readers output silence.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.receiver.is_ready()
    }

    #[inline]
    pub fn bank(&self, index: usize) -> &Wavetable {
        &self.banks[index.min(NUM_BANKS - 1)]
    }
}

impl BankLoader {
    /// Build a bank from decoded audio and publish it into slot `bank`.
    pub fn load(&mut self, bank: usize, sample: &DecodedSample) -> LoadResult {
        if bank >= NUM_BANKS {
            return Err(LoadError::BankOutOfRange(bank));
        }

        self.publisher.begin();
        let table = match Wavetable::from_decoded(sample) {
            Ok(table) => table,
            Err(e) => {
                warn!("wavetable bank {bank}: {e}; keeping previous table");
                self.publisher.abort();
                return Err(e);
            }
        };
        self.publisher.publish(bank, Box::new(table))?;
        info!(
            "wavetable bank {bank}: loaded {} source samples",
            sample.len()
        );
        Ok(())
    }

    /// Decode a WAV file and load it into slot `bank`.
    pub fn load_file(&mut self, bank: usize, path: impl AsRef<Path>) -> LoadResult {
        if bank >= NUM_BANKS {
            return Err(LoadError::BankOutOfRange(bank));
        }
        let sample = io::decode(path)?;
        self.load(bank, &sample)
    }

    /// Free banks the audio side has retired.
    pub fn collect(&mut self) -> usize {
        self.publisher.collect()
    }

    pub fn is_ready(&self) -> bool {
        self.publisher.is_ready()
    }
}
