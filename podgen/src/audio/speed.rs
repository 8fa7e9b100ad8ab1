//! Playback speed change without pitch correction.

use super::wav::{Audio, read_wav, write_audio};
use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;

/// Play `audio` at `speed` times its rate, then resample back to the nominal
/// rate. Below 1.0 the result is longer and lower; above 1.0 shorter and higher.
pub fn retime(audio: &Audio, speed: f64) -> Result<Audio> {
    if !speed.is_finite() || speed <= 0.0 {
        anyhow::bail!("Speed must be a positive number, got {}", speed);
    }

    let played_rate = (audio.sample_rate as f64 * speed) as u32;
    if played_rate == 0 {
        anyhow::bail!("Speed {} is too low for {} Hz audio", speed, audio.sample_rate);
    }

    let samples = resample_interleaved(
        &audio.samples,
        audio.channels.max(1) as usize,
        played_rate,
        audio.sample_rate,
    )?;

    Ok(Audio {
        samples,
        channels: audio.channels,
        sample_rate: audio.sample_rate,
    })
}

/// Rewrite a WAV file at a new playback speed. `1.0` leaves it untouched.
pub fn change_speed(path: &Path, speed: f64) -> Result<()> {
    if speed == 1.0 {
        return Ok(());
    }

    let audio = read_wav(path)?;
    let adjusted = retime(&audio, speed)?;
    log::debug!(
        "Speed {}: {:.1}s -> {:.1}s",
        speed,
        audio.duration_secs(),
        adjusted.duration_secs()
    );
    write_audio(path, &adjusted)
}

/// Resample interleaved audio, compensating the filter delay so the output
/// stays aligned and has exactly `frames * to / from` frames.
fn resample_interleaved(samples: &[f64], channels: usize, from_sr: u32, to_sr: u32) -> Result<Vec<f64>> {
    let frames = samples.len() / channels;
    if frames == 0 {
        return Ok(Vec::new());
    }
    if from_sr == to_sr {
        return Ok(samples.to_vec());
    }

    let ratio = to_sr as f64 / from_sr as f64;
    let expected = (frames as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f64>::new(ratio, 2.0, params, frames, channels)?;

    let input: Vec<Vec<f64>> = (0..channels)
        .map(|c| samples.iter().skip(c).step_by(channels).copied().collect())
        .collect();

    let mut output = resampler.process(&input, None)?;
    // Push zeros through to drain the delay line.
    let tail = resampler.process_partial(None::<&[Vec<f64>]>, None)?;
    for (channel, rest) in output.iter_mut().zip(tail) {
        channel.extend(rest);
    }

    let delay = resampler.output_delay();
    let mut interleaved = Vec::with_capacity(expected * channels);
    for frame in delay..delay + expected {
        for channel in &output {
            interleaved.push(channel.get(frame).copied().unwrap_or(0.0));
        }
    }

    Ok(interleaved)
}
