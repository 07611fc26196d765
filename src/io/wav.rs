//! WAV file decoding to a mono float buffer.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use hound::{SampleFormat, WavReader};
use log::{info, warn};

use crate::error::{LoadError, LoadResult};

/// A decoded, mono sample buffer in [-1, 1] plus its native rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSample {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedSample {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds at the native rate.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode the WAV file at `path`.
pub fn decode(path: impl AsRef<Path>) -> LoadResult<DecodedSample> {
    let path = path.as_ref();
    let file = File::open(path)?;
    match decode_reader(BufReader::new(file)) {
        Ok(sample) => {
            info!(
                "decoded {:?}: {} samples at {} Hz",
                path,
                sample.len(),
                sample.sample_rate
            );
            Ok(sample)
        }
        Err(e) => {
            warn!("failed to decode {:?}: {e}", path);
            Err(e)
        }
    }
}

/// Decode a WAV stream.
///
/// Accepts 16-bit integer PCM and 32-bit float, mono or stereo. Stereo is
/// averaged to mono.
pub fn decode_reader<R: Read + Seek>(mut reader: R) -> LoadResult<DecodedSample> {
    check_magic(&mut reader)?;

    let mut wav = WavReader::new(reader)?;
    let spec = wav.spec();

    if !(1..=2).contains(&spec.channels) {
        return Err(LoadError::UnsupportedChannels(spec.channels));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => wav
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Float, 32) => wav.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits) => {
            return Err(LoadError::UnsupportedFormat { format: "PCM", bits })
        }
        (SampleFormat::Float, bits) => {
            return Err(LoadError::UnsupportedFormat {
                format: "IEEE float",
                bits,
            })
        }
    };

    let samples: Vec<f32> = if spec.channels == 2 {
        interleaved
            .chunks_exact(2)
            .map(|frame| 0.5 * (frame[0] + frame[1]))
            .collect()
    } else {
        interleaved
    };

    if samples.is_empty() {
        return Err(LoadError::Empty);
    }

    Ok(DecodedSample::new(samples, spec.sample_rate))
}

/// Check the `RIFF....WAVE` header, leaving the reader where it started.
fn check_magic<R: Read + Seek>(reader: &mut R) -> LoadResult {
    let start = reader.stream_position()?;
    let mut header = [0u8; 12];
    let filled = read_up_to(reader, &mut header)?;
    reader.seek(SeekFrom::Start(start))?;

    if filled < 4 || &header[0..4] != b"RIFF" {
        return Err(LoadError::NotRiff);
    }
    if filled < 12 || &header[8..12] != b"WAVE" {
        return Err(LoadError::NotWave);
    }
    Ok(())
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use std::io::Cursor;

    fn write_wav(spec: WavSpec, write: impl FnOnce(&mut WavWriter<&mut Cursor<Vec<u8>>>)) -> Cursor<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.set_position(0);
        cursor
    }

    fn spec(channels: u16, bits: u16, format: SampleFormat) -> WavSpec {
        WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: bits,
            sample_format: format,
        }
    }

    #[test]
    fn decodes_pcm16_mono() {
        let data = write_wav(spec(1, 16, SampleFormat::Int), |w| {
            for v in [0i16, 16384, -32768, 32767] {
                w.write_sample(v).unwrap();
            }
        });
        let decoded = decode_reader(data).unwrap();
        assert_eq!(decoded.sample_rate, 44_100);
        assert_eq!(decoded.samples.len(), 4);
        assert_eq!(decoded.samples[1], 0.5);
        assert_eq!(decoded.samples[2], -1.0);
    }

    #[test]
    fn averages_stereo_float() {
        let data = write_wav(spec(2, 32, SampleFormat::Float), |w| {
            for v in [1.0f32, 0.0, 0.5, -0.5] {
                w.write_sample(v).unwrap();
            }
        });
        let decoded = decode_reader(data).unwrap();
        assert_eq!(decoded.samples, vec![0.5, 0.0]);
    }

    #[test]
    fn rejects_24_bit_pcm() {
        let data = write_wav(spec(1, 24, SampleFormat::Int), |w| {
            w.write_sample(1i32).unwrap();
        });
        assert!(matches!(
            decode_reader(data),
            Err(LoadError::UnsupportedFormat { bits: 24, .. })
        ));
    }

    #[test]
    fn rejects_three_channels() {
        let data = write_wav(spec(3, 16, SampleFormat::Int), |w| {
            for _ in 0..3 {
                w.write_sample(0i16).unwrap();
            }
        });
        assert!(matches!(
            decode_reader(data),
            Err(LoadError::UnsupportedChannels(3))
        ));
    }

    #[test]
    fn rejects_non_riff_and_non_wave() {
        let not_riff = Cursor::new(b"OggS\0\0\0\0\0\0\0\0".to_vec());
        assert!(matches!(decode_reader(not_riff), Err(LoadError::NotRiff)));

        let not_wave = Cursor::new(b"RIFF\x04\0\0\0AVI ".to_vec());
        assert!(matches!(decode_reader(not_wave), Err(LoadError::NotWave)));

        let short = Cursor::new(b"RI".to_vec());
        assert!(matches!(decode_reader(short), Err(LoadError::NotRiff)));
    }

    #[test]
    fn rejects_empty_data() {
        let data = write_wav(spec(1, 16, SampleFormat::Int), |_| {});
        assert!(matches!(decode_reader(data), Err(LoadError::Empty)));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            decode("/definitely/not/here.wav"),
            Err(LoadError::Io(_))
        ));
    }
}
