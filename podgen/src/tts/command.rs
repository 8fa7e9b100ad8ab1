//! External-program TTS backend.
//!
//! Runs any dialogue TTS that can be driven from a command line, for example a
//! small Python script around Dia in its own virtualenv. Arguments may contain
//! the placeholders `{text}`, `{output}` and `{audio_prompt}`; an argument that
//! mentions `{audio_prompt}` is dropped when no voice clone is configured.

use super::{TtsBackend, TtsOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// TTS backend that shells out to a configured program.
#[derive(Debug)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    /// `command[0]` is the program, the rest are argument templates.
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("No TTS command configured. Set `tts_command` in the podgen config.")?;

        if !args.iter().any(|a| a.contains("{output}")) {
            anyhow::bail!("TTS command must pass {{output}} to the program");
        }

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Expand the argument templates for one turn.
    fn render_args(&self, text: &str, output_path: &Path, audio_prompt: Option<&Path>) -> Vec<String> {
        let output = output_path.to_string_lossy();
        let audio_prompt = audio_prompt.map(|p| p.to_string_lossy());

        self.args
            .iter()
            .filter_map(|template| {
                if template.contains("{audio_prompt}") && audio_prompt.is_none() {
                    return None;
                }
                let values = [
                    ("{text}", text),
                    ("{output}", output.as_ref()),
                    ("{audio_prompt}", audio_prompt.as_deref().unwrap_or_default()),
                ];
                Some(expand(template, &values))
            })
            .collect()
    }
}

/// Replace placeholders in one left-to-right pass, so substituted values are
/// never expanded again.
fn expand(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        match values.iter().find(|(key, _)| rest.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &rest[key.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[async_trait]
impl TtsBackend for CommandBackend {
    async fn synthesize(
        &self,
        text: &str,
        output_path: &Path,
        options: &TtsOptions,
    ) -> Result<()> {
        let (input, audio_prompt) = options.engine_input(text);
        let args = self.render_args(&input, output_path, audio_prompt);

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run TTS command: {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("TTS command failed: {}", stderr.trim());
        }

        if !output_path.exists() {
            anyhow::bail!(
                "TTS command succeeded but wrote no audio to {}",
                output_path.display()
            );
        }

        Ok(())
    }

    fn device(&self) -> &str {
        "external"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_requires_program() {
        assert!(CommandBackend::new(&[]).is_err());
    }

    #[test]
    fn test_requires_output_placeholder() {
        let result = CommandBackend::new(&strings(&["dia-tts", "--text", "{text}"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_render_args_with_clone() {
        let backend = CommandBackend::new(&strings(&[
            "dia-tts",
            "--text={text}",
            "--out",
            "{output}",
            "--audio-prompt={audio_prompt}",
        ]))
        .unwrap();

        let args = backend.render_args(
            "[S1] Hi.",
            Path::new("Output/dialogue_0.wav"),
            Some(Path::new("sample.mp3")),
        );
        assert_eq!(
            args,
            vec![
                "--text=[S1] Hi.",
                "--out",
                "Output/dialogue_0.wav",
                "--audio-prompt=sample.mp3"
            ]
        );
    }

    #[test]
    fn test_render_args_without_clone_drops_prompt_arg() {
        let backend = CommandBackend::new(&strings(&[
            "dia-tts",
            "{text}",
            "{output}",
            "--audio-prompt={audio_prompt}",
        ]))
        .unwrap();

        let args = backend.render_args("[S2] Yo.", Path::new("out.wav"), None);
        assert_eq!(args, vec!["[S2] Yo.", "out.wav"]);
    }

    #[test]
    fn test_placeholders_in_turn_text_are_kept() {
        let backend = CommandBackend::new(&strings(&[
            "dia-tts",
            "{text}",
            "{output}",
            "--audio-prompt={audio_prompt}",
        ]))
        .unwrap();

        let args = backend.render_args("[S1] a {output} b {audio_prompt}", Path::new("o.wav"), None);
        assert_eq!(args, vec!["[S1] a {output} b {audio_prompt}", "o.wav"]);

        let args = backend.render_args("{text}", Path::new("o.wav"), Some(Path::new("{text}.wav")));
        assert_eq!(args, vec!["{text}", "o.wav", "--audio-prompt={text}.wav"]);
    }

    #[test]
    fn test_expand_leaves_unknown_braces() {
        let values = [("{text}", "hi")];
        assert_eq!(expand("{x} {text}{", &values), "{x} hi{");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_synthesize_runs_program() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("turns").join("dialogue_0.wav");

        // `cp` stands in for an engine that writes the output file.
        let source = temp_dir.path().join("source.wav");
        std::fs::write(&source, b"RIFF").unwrap();
        let backend = CommandBackend::new(&strings(&[
            "cp",
            source.to_str().unwrap(),
            "{output}",
        ]))
        .unwrap();

        backend
            .synthesize("[S1] Hi.", &output, &TtsOptions::new())
            .await
            .unwrap();
        assert!(output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_synthesize_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let backend = CommandBackend::new(&strings(&["false", "{output}"])).unwrap();

        let result = backend
            .synthesize("[S1] Hi.", &temp_dir.path().join("x.wav"), &TtsOptions::new())
            .await;
        assert!(result.is_err());
    }
}
