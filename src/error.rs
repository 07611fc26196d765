use thiserror::Error;

/// Error that can happen when loading external audio into an engine.
///
/// Load failures never disturb the engine being loaded into: it keeps
/// playing its previous (or synthesized default) buffer.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Missing `RIFF` magic at the start of the file
    #[error("not a RIFF file")]
    NotRiff,
    /// RIFF container that isn't `WAVE`
    #[error("RIFF file is not WAVE")]
    NotWave,
    /// Only 16-bit integer PCM and 32-bit float are decoded
    #[error("unsupported sample format: {format} with {bits} bits per sample")]
    UnsupportedFormat { format: &'static str, bits: u16 },
    /// Only mono and stereo sources are decoded
    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(u16),
    /// The data chunk held no sample frames
    #[error("file contains no samples")]
    Empty,
    /// Chunk-level decode failure reported by the WAV reader
    #[error("WAV decode error: {0}")]
    Decode(#[from] hound::Error),
    /// Bank index outside the wavetable's bank count
    #[error("wavetable bank {0} out of range")]
    BankOutOfRange(usize),
    /// The audio side has not drained the previous table yet
    #[error("handoff queue is full; previous load still pending")]
    QueueFull,
}

/// Result of attempting to load external audio
pub type LoadResult<T = ()> = Result<T, LoadError>;
