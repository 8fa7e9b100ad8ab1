//! podgen configuration management.

use crate::audio::DEFAULT_SILENCE_MS;
use crate::text::DEFAULT_CHUNK_WORDS;
use crate::tts::{BackendKind, BackendSettings, DEFAULT_CLONE_TEXT, VoiceClone};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;

const DEFAULT_SPEED: f64 = 0.95;
const DEFAULT_OUTPUT_DIR: &str = "Output";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodgenConfig {
    /// Words per cleanup chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Playback speed applied to the final track
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Silence between turns, in milliseconds
    #[serde(default = "default_silence_ms")]
    pub silence_ms: u32,

    /// Where scripts and audio are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Release each model once its stage is done
    #[serde(default = "default_clear_models")]
    pub clear_models: bool,

    /// Transcript of the voice-clone sample
    #[serde(default = "default_voice_clone_text")]
    pub voice_clone_text: String,

    /// Voice-clone sample audio. None disables cloning.
    #[serde(default)]
    pub voice_clone_audio: Option<PathBuf>,

    /// TTS engine
    #[serde(default)]
    pub tts_backend: BackendKind,

    /// Device to use (mps, cuda, cpu). None means auto-detect.
    #[serde(default)]
    pub device: Option<String>,

    /// Program and argument templates for the command backend
    #[serde(default)]
    pub tts_command: Vec<String>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_WORDS
}

fn default_speed() -> f64 {
    DEFAULT_SPEED
}

fn default_silence_ms() -> u32 {
    DEFAULT_SILENCE_MS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_clear_models() -> bool {
    true
}

fn default_voice_clone_text() -> String {
    DEFAULT_CLONE_TEXT.to_string()
}

impl Default for PodgenConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            speed: default_speed(),
            silence_ms: default_silence_ms(),
            output_dir: default_output_dir(),
            clear_models: default_clear_models(),
            voice_clone_text: default_voice_clone_text(),
            voice_clone_audio: None,
            tts_backend: BackendKind::default(),
            device: None,
            tts_command: Vec::new(),
        }
    }
}

impl PodgenConfig {
    /// Get the config file path: ~/.config/cli-programs/podgen.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("podgen.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: PodgenConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be at least 1");
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            anyhow::bail!("speed must be a positive number, got {}", self.speed);
        }
        Ok(())
    }

    pub fn chunk_words(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.chunk_size)
            .ok_or_else(|| anyhow::anyhow!("chunk_size must be at least 1"))
    }

    /// Voice clone, present only when a sample audio file is configured.
    pub fn voice_clone(&self) -> Option<VoiceClone> {
        self.voice_clone_audio
            .as_ref()
            .map(|audio| VoiceClone::new(self.voice_clone_text.clone(), audio.clone()))
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            kind: self.tts_backend,
            device: self.device.clone(),
            command: self.tts_command.clone(),
        }
    }
}
