//! Per-turn synthesis and concatenation into one track.

use super::wav::{Audio, read_wav, write_audio};
use crate::tts::{TtsBackend, TtsOptions};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Gap inserted between consecutive turns.
pub const DEFAULT_SILENCE_MS: u32 = 400;

/// Synthesized turn files, removed from disk when dropped.
#[derive(Debug, Default)]
pub struct SegmentFiles {
    paths: Vec<PathBuf>,
}

impl SegmentFiles {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for SegmentFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Path of the audio file for turn `index`.
pub fn segment_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("dialogue_{}.wav", index))
}

/// Synthesize every turn in order into `dir/dialogue_<i>.wav`.
///
/// Files written before a failure are removed along with the returned guard.
pub async fn synthesize_turns<F>(
    backend: &dyn TtsBackend,
    turns: &[String],
    options: &TtsOptions,
    dir: &Path,
    mut on_progress: F,
) -> Result<SegmentFiles>
where
    F: FnMut(usize, usize),
{
    let mut files = SegmentFiles::default();
    let total = turns.len();

    for (index, turn) in turns.iter().enumerate() {
        let path = segment_path(dir, index);
        log::debug!("Turn {}/{}: {}", index + 1, total, turn);

        // Track the path first so a partial file is still cleaned up.
        files.paths.push(path.clone());
        backend
            .synthesize(turn, &path, options)
            .await
            .with_context(|| format!("Failed to synthesize turn {}", index))?;

        on_progress(index + 1, total);
    }

    Ok(files)
}

/// Number of interleaved samples in a gap of `silence_ms`.
fn silence_samples(silence_ms: u32, sample_rate: u32, channels: u16) -> usize {
    let frames = (sample_rate as u64 * silence_ms as u64 / 1000) as usize;
    frames * channels as usize
}

/// Concatenate segments with a silence gap between each pair.
pub fn join_segments(segments: &[Audio], silence_ms: u32) -> Result<Audio> {
    let (first, rest) = segments
        .split_first()
        .context("No audio segments to compose")?;

    let gap = silence_samples(silence_ms, first.sample_rate, first.channels);
    let capacity = segments.iter().map(|s| s.samples.len()).sum::<usize>() + gap * rest.len();
    let mut samples = Vec::with_capacity(capacity);
    samples.extend_from_slice(&first.samples);

    for (offset, segment) in rest.iter().enumerate() {
        if segment.sample_rate != first.sample_rate || segment.channels != first.channels {
            anyhow::bail!(
                "Segment {} is {} Hz / {} ch, expected {} Hz / {} ch",
                offset + 1,
                segment.sample_rate,
                segment.channels,
                first.sample_rate,
                first.channels
            );
        }
        samples.resize(samples.len() + gap, 0.0);
        samples.extend_from_slice(&segment.samples);
    }

    Ok(Audio {
        samples,
        channels: first.channels,
        sample_rate: first.sample_rate,
    })
}

/// Read `segments` in order and write them to `output` separated by silence.
pub fn compose_track(segments: &[PathBuf], output: &Path, silence_ms: u32) -> Result<()> {
    let audio = segments
        .iter()
        .map(|path| read_wav(path))
        .collect::<Result<Vec<_>>>()?;

    let track = join_segments(&audio, silence_ms)?;
    log::info!(
        "Composed {} segments ({:.1}s) into {}",
        audio.len(),
        track.duration_secs(),
        output.display()
    );
    write_audio(output, &track)
}
