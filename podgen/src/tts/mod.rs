//! TTS backend trait and types.

pub mod command;
#[cfg(feature = "dia")]
pub mod dia;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference dialogue used for the bundled voice sample.
pub const DEFAULT_CLONE_TEXT: &str = "[S1] Dia is an open weights text to dialogue model. \
[S2] You get full control over scripts and voices. [S1] Wow. Amazing. \
[S2] Try it now on Git hub or Hugging Face.";

/// A fixed text + audio pair that conditions the synthesized voices.
///
/// The text must be the transcript of the audio, with speaker markers.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceClone {
    pub text: String,
    pub audio: PathBuf,
}

impl VoiceClone {
    pub fn new(text: impl Into<String>, audio: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            audio: audio.into(),
        }
    }

    /// Text handed to the engine: the reference transcript, then the turn.
    pub fn prompt_for(&self, text: &str) -> String {
        format!("{} {}", self.text.trim_end(), text)
    }
}

/// Options applied identically to every synthesized turn.
#[derive(Debug, Clone, Default)]
pub struct TtsOptions {
    /// Optional voice-cloning reference
    pub voice_clone: Option<VoiceClone>,
    /// Release the loaded model after each synthesis
    pub clear: bool,
}

impl TtsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice_clone(mut self, clone: VoiceClone) -> Self {
        self.voice_clone = Some(clone);
        self
    }

    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// Engine input text and audio prompt for one turn.
    pub fn engine_input(&self, text: &str) -> (String, Option<&Path>) {
        match &self.voice_clone {
            Some(clone) => (clone.prompt_for(text), Some(clone.audio.as_path())),
            None => (text.to_string(), None),
        }
    }
}

/// Which engine renders the dialogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Nari Labs Dia through embedded Python
    #[default]
    Dia,
    /// An external program
    Command,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dia" => Ok(Self::Dia),
            "command" | "cmd" => Ok(Self::Command),
            _ => anyhow::bail!("Unknown TTS backend: {} (expected 'dia' or 'command')", s),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dia => write!(f, "dia"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// TTS backend trait - all TTS engines implement this.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize one dialogue turn to a WAV file.
    async fn synthesize(&self, text: &str, output_path: &Path, options: &TtsOptions)
    -> Result<()>;

    /// Drop any loaded model.
    fn release(&self) {}

    /// Device being used (mps, cuda, cpu, external).
    fn device(&self) -> &str;
}

/// A lazily loaded engine model that in-process backends keep between turns.
///
/// Generation only borrows the model, so once `take()` hands it out the
/// caller holds the last reference and dropping it frees the weights.
#[cfg_attr(not(feature = "dia"), allow(dead_code))]
#[derive(Debug)]
pub struct ModelSlot<M> {
    model: Option<M>,
    loads: usize,
}

#[cfg_attr(not(feature = "dia"), allow(dead_code))]
impl<M> ModelSlot<M> {
    pub fn new() -> Self {
        Self {
            model: None,
            loads: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Times the model has been loaded.
    pub fn load_count(&self) -> usize {
        self.loads
    }

    /// Load the model if needed, then run `f` against it.
    pub fn with<T>(
        &mut self,
        load: impl FnOnce() -> Result<M>,
        f: impl FnOnce(&M) -> Result<T>,
    ) -> Result<T> {
        let model = match self.model.take() {
            Some(model) => model,
            None => {
                let model = load()?;
                self.loads += 1;
                model
            }
        };
        f(self.model.insert(model))
    }

    /// Remove the model, leaving the slot empty.
    pub fn take(&mut self) -> Option<M> {
        self.model.take()
    }
}

/// Settings needed to build a backend.
#[derive(Debug, Clone, Default)]
pub struct BackendSettings {
    pub kind: BackendKind,
    /// Device for in-process engines; None means auto-detect
    pub device: Option<String>,
    /// Program and argument templates for the command backend
    pub command: Vec<String>,
}

/// Create a TTS backend.
pub fn create_backend(settings: &BackendSettings) -> Result<Box<dyn TtsBackend>> {
    match settings.kind {
        BackendKind::Command => Ok(Box::new(command::CommandBackend::new(&settings.command)?)),
        #[cfg(feature = "dia")]
        BackendKind::Dia => Ok(Box::new(dia::DiaBackend::new(settings.device.as_deref())?)),
        #[cfg(not(feature = "dia"))]
        BackendKind::Dia => anyhow::bail!(
            "The dia backend is not compiled in. Rebuild with `--features dia` \
             or set `tts_backend = \"command\"` in the podgen config."
        ),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_input_without_clone() {
        let options = TtsOptions::new();
        let (text, audio) = options.engine_input("[S1] Hi.");
        assert_eq!(text, "[S1] Hi.");
        assert!(audio.is_none());
    }

    #[test]
    fn test_engine_input_with_clone() {
        let options = TtsOptions::new()
            .with_voice_clone(VoiceClone::new("[S1] Reference. ", "sample.mp3"))
            .with_clear(true);
        let (text, audio) = options.engine_input("[S2] Turn.");
        assert_eq!(text, "[S1] Reference. [S2] Turn.");
        assert_eq!(audio, Some(Path::new("sample.mp3")));
        assert!(options.clear);
    }

    #[test]
    fn test_model_slot_loads_once() {
        let mut slot = ModelSlot::new();
        for turn in 0..3 {
            let value = slot.with(|| Ok(10), |model| Ok(model + turn)).unwrap();
            assert_eq!(value, 10 + turn);
        }
        assert!(slot.is_loaded());
        assert_eq!(slot.load_count(), 1);
    }

    #[test]
    fn test_model_slot_take_holds_last_reference() {
        let mut slot = ModelSlot::new();
        let mut weak = None;
        slot.with(
            || Ok(std::sync::Arc::new(vec![0u8; 16])),
            |model| {
                weak = Some(std::sync::Arc::downgrade(model));
                Ok(())
            },
        )
        .unwrap();

        let model = slot.take().unwrap();
        assert_eq!(std::sync::Arc::strong_count(&model), 1);
        drop(model);
        assert!(weak.unwrap().upgrade().is_none());
        assert!(!slot.is_loaded());
    }

    #[test]
    fn test_model_slot_reloads_after_take() {
        let mut slot = ModelSlot::new();
        slot.with(|| Ok(1), |_| Ok(())).unwrap();
        slot.take();
        slot.with(|| Ok(2), |model| {
            assert_eq!(*model, 2);
            Ok(())
        })
        .unwrap();
        assert_eq!(slot.load_count(), 2);
    }

    #[test]
    fn test_model_slot_load_failure_leaves_empty() {
        let mut slot: ModelSlot<u32> = ModelSlot::new();
        let result = slot.with(|| Err(anyhow::anyhow!("no weights")), |_| Ok(()));
        assert!(result.is_err());
        assert!(!slot.is_loaded());
        assert_eq!(slot.load_count(), 0);
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("dia".parse::<BackendKind>().unwrap(), BackendKind::Dia);
        assert_eq!("Command".parse::<BackendKind>().unwrap(), BackendKind::Command);
        assert!("espeak".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Command.to_string(), "command");
    }

    #[cfg(not(feature = "dia"))]
    #[test]
    fn test_dia_requires_feature() {
        let settings = BackendSettings::default();
        let err = create_backend(&settings).err().unwrap();
        assert!(err.to_string().contains("--features dia"));
    }
}
