//! Output backends: offline WAV render or live playback.

use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::info;

use super::patch::{Loaders, Rack, Settings};

/// Render `seconds` of the patch to a 32-bit float stereo WAV.
pub fn render(settings: &Settings, seconds: f32, path: &Path) -> EyreResult<()> {
    let (mut rack, _loaders) = Rack::new(settings)?;

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: settings.sample_rate as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .wrap_err_with(|| format!("failed to create {}", path.display()))?;

    let frames = (seconds.max(0.0) * settings.sample_rate) as u64;
    for _ in 0..frames {
        let (left, right) = rack.next_frame();
        writer.write_sample(left)?;
        writer.write_sample(right)?;
    }
    writer.finalize().wrap_err("failed to finalize WAV")?;

    info!("rendered {frames} frames to {}", path.display());
    Ok(())
}

/// Play the patch on the default output device until interrupted.
pub fn play(settings: &mut Settings) -> EyreResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    settings.sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    let (mut rack, mut loaders): (Rack, Loaders) = Rack::new(settings)?;

    info!(
        "playing {:?} at {} BPM, {} Hz, {} channels",
        settings.kind, settings.bpm, settings.sample_rate, channels
    );

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            for frame in data.chunks_mut(channels) {
                let (left, right) = rack.next_frame();
                for (ch, out) in frame.iter_mut().enumerate() {
                    *out = if ch % 2 == 0 { left } else { right };
                }
            }
        },
        |err| log::error!("audio error: {err}"),
        None,
    )?;

    stream.play()?;
    println!("Playing... Press Ctrl+C to stop");

    loop {
        std::thread::sleep(Duration::from_millis(100));
        loaders.collect();
    }
}
