//! Stage orchestration: document to script, script to audio.

use crate::audio::{change_speed, compose_track, synthesize_turns};
use crate::pdf;
use crate::script::{self, DialogueAssembler, Script, UnlabeledLines, convert_to_dialogues};
use crate::text::{chunk_words, normalize_chunks};
use crate::tts::{TtsBackend, TtsOptions};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use llm_client::ModelHandle;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Settings shared by both halves of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Base name of the artifacts (input file stem)
    pub name: String,
    pub output_dir: PathBuf,
    pub chunk_size: NonZeroUsize,
    pub speed: f64,
    pub silence_ms: u32,
    /// Release models as soon as their stage is done
    pub clear_models: bool,
    pub unlabeled: UnlabeledLines,
    pub tts: TtsOptions,
    /// Draw progress bars on stderr
    pub show_progress: bool,
}

impl PipelineOptions {
    pub fn script_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_script.txt", self.name))
    }

    pub fn audio_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.wav", self.name))
    }
}

fn progress_bar(total: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Clean `text` chunk by chunk, then write a script over the result.
pub async fn script_from_text(
    text: &str,
    cleanup: &mut ModelHandle,
    writer: &mut ModelHandle,
    options: &PipelineOptions,
) -> Result<Script> {
    let chunks: Vec<String> = chunk_words(text, options.chunk_size).collect();
    if chunks.is_empty() {
        anyhow::bail!("No text to process");
    }
    eprintln!("Cleaning {} chunks with {}...", chunks.len(), cleanup.label());

    let pb = progress_bar(chunks.len(), options.show_progress)?;
    let document = normalize_chunks(cleanup, chunks, options.clear_models, |done, _| {
        pb.set_position(done as u64);
    })
    .await;
    pb.finish_with_message("cleanup done");

    if document.fallback_count() > 0 {
        log::warn!(
            "{} of {} chunks kept their original text",
            document.fallback_count(),
            document.len()
        );
    }

    eprintln!("Writing script with {}...", writer.label());
    let script = script::generate_script(writer, &document.text(), options.clear_models).await?;
    Ok(script)
}

/// Extract a PDF, write its script to `<output_dir>/<name>_script.txt`.
pub async fn script_from_pdf(
    path: &Path,
    cleanup: &mut ModelHandle,
    writer: &mut ModelHandle,
    options: &PipelineOptions,
) -> Result<(Script, PathBuf)> {
    let text = pdf::extract_text(path)?;
    log::debug!("Extracted {} characters", text.len());

    let script = script_from_text(&text, cleanup, writer, options).await?;

    let script_path = options.script_path();
    script.save(&script_path)?;
    eprintln!("Script: {}", script_path.display());
    Ok((script, script_path))
}

/// Synthesize every turn of `script` and write the final track.
///
/// Per-turn files are removed whether or not composition succeeds.
pub async fn render_podcast(
    script: &Script,
    backend: &dyn TtsBackend,
    options: &PipelineOptions,
) -> Result<PathBuf> {
    let turns = match options.unlabeled {
        UnlabeledLines::PassThrough => convert_to_dialogues(script.text()),
        policy => DialogueAssembler::new()
            .with_unlabeled(policy)
            .assemble(script.text())?,
    };
    if turns.is_empty() {
        anyhow::bail!("Script has no dialogue lines");
    }
    eprintln!(
        "Synthesizing {} turns on {}...",
        turns.len(),
        backend.device()
    );

    let pb = progress_bar(turns.len(), options.show_progress)?;
    let segments = synthesize_turns(
        backend,
        &turns,
        &options.tts,
        &options.output_dir,
        |done, _| pb.set_position(done as u64),
    )
    .await?;
    pb.finish_with_message("synthesis done");
    log::debug!("{} segment files written", segments.paths().len());

    if options.tts.clear {
        backend.release();
    }

    let output = options.audio_path();
    compose_track(segments.paths(), &output, options.silence_ms)
        .context("Failed to compose podcast")?;
    drop(segments);

    change_speed(&output, options.speed)
        .with_context(|| format!("Failed to change speed to {}", options.speed))?;

    Ok(output)
}
