//! Dia TTS backend using PyO3 to embed Python.
//!
//! Nari Labs Dia renders `[S1]`/`[S2]` tagged dialogue in one pass and can
//! clone voices from a reference clip plus its transcript. The model is kept
//! loaded between turns unless the caller asks for it to be cleared.

use super::{ModelSlot, TtsBackend, TtsOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

/// Hugging Face repository of the model.
const DIA_MODEL: &str = "nari-labs/Dia-1.6B";

/// Initialize Python runtime once.
static PYTHON_INIT: Once = Once::new();

/// Dia TTS backend using PyO3.
pub struct DiaBackend {
    /// Device to use (mps, cuda, cpu)
    device: String,
    /// Loaded `Dia` instance, if any
    model: Arc<Mutex<ModelSlot<Py<PyAny>>>>,
}

impl DiaBackend {
    /// Create a new Dia backend.
    ///
    /// # Arguments
    /// * `device` - Device to use: "mps", "cuda", "cpu", or None for auto-detect
    pub fn new(device: Option<&str>) -> Result<Self> {
        PYTHON_INIT.call_once(|| {
            let site_packages = virtualenv_site_packages();

            pyo3::prepare_freethreaded_python();

            // Make an activated virtualenv's packages importable.
            if let Some(site_packages) = site_packages {
                let _ = Python::with_gil(|py| -> PyResult<()> {
                    let sys = py.import("sys")?;
                    let path = sys.getattr("path")?;
                    path.call_method1("insert", (0, site_packages.to_string_lossy().as_ref()))?;
                    Ok(())
                });
            }
        });

        Python::with_gil(|py| py.import("dia.model").map(|_| ()))
            .context("Python package `dia` is not importable. Install nari-labs/dia in the active virtualenv.")?;

        let device = match device {
            Some(d) => d.to_string(),
            None => Self::detect_device()?,
        };
        log::info!("Dia backend on device {}", device);

        Ok(Self {
            device,
            model: Arc::new(Mutex::new(ModelSlot::new())),
        })
    }

    /// Auto-detect the best available device.
    fn detect_device() -> Result<String> {
        Python::with_gil(|py| {
            let torch = py.import("torch").context("Failed to import torch")?;

            let backends = torch.getattr("backends")?;
            let mps = backends.getattr("mps")?;
            if mps.call_method0("is_available")?.extract::<bool>()? {
                return Ok("mps".to_string());
            }

            let cuda = torch.getattr("cuda")?;
            if cuda.call_method0("is_available")?.extract::<bool>()? {
                return Ok("cuda".to_string());
            }

            Ok("cpu".to_string())
        })
    }
}

/// Site-packages directory of `$VIRTUAL_ENV`, if one is active.
fn virtualenv_site_packages() -> Option<PathBuf> {
    let venv = PathBuf::from(std::env::var_os("VIRTUAL_ENV")?);
    std::fs::read_dir(venv.join("lib"))
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("python3"))
        })
        .map(|python_dir| python_dir.join("site-packages"))
        .filter(|site_packages| site_packages.exists())
}

/// Load the model on `device`.
fn load_model(py: Python<'_>, device: &str) -> Result<Py<PyAny>> {
    log::debug!("Loading {} on {}", DIA_MODEL, device);
    let dia_class = py.import("dia.model")?.getattr("Dia")?;
    let kwargs = PyDict::new(py);
    kwargs.set_item("compute_dtype", "float16")?;
    kwargs.set_item("device", device)?;
    let model = dia_class.call_method("from_pretrained", (DIA_MODEL,), Some(&kwargs))?;
    Ok(model.unbind())
}

/// Free the model and the accelerator cache.
fn release_model(py: Python<'_>, slot: &mut ModelSlot<Py<PyAny>>, device: &str) -> Result<()> {
    let Some(model) = slot.take() else {
        return Ok(());
    };
    // Last reference; drop it before collecting so the weights can go.
    drop(model);

    py.import("gc")?.call_method0("collect")?;

    let torch = py.import("torch")?;
    let cache_owner = match device {
        "mps" => Some(torch.getattr("mps")?),
        "cuda" => Some(torch.getattr("cuda")?),
        _ => None,
    };
    if let Some(owner) = cache_owner {
        if owner.hasattr("empty_cache")? {
            owner.call_method0("empty_cache")?;
        }
    }

    log::debug!("Released {}", DIA_MODEL);
    Ok(())
}

/// Generate one turn and save it as audio.
fn generate_audio_sync(
    model_slot: &Mutex<ModelSlot<Py<PyAny>>>,
    device: &str,
    text: &str,
    output_path: &Path,
    options: &TtsOptions,
) -> Result<()> {
    let mut slot = model_slot
        .lock()
        .map_err(|_| anyhow::anyhow!("Dia model lock poisoned"))?;

    Python::with_gil(|py| {
        let os = py.import("os")?;
        os.getattr("environ")?
            .set_item("PYTORCH_ENABLE_MPS_FALLBACK", "1")?;

        slot.with(
            || load_model(py, device),
            |model| -> Result<()> {
                let model = model.bind(py);

                let (input, audio_prompt) = options.engine_input(text);
                let gen_kwargs = PyDict::new(py);
                if let Some(audio_prompt) = audio_prompt {
                    gen_kwargs.set_item("audio_prompt", audio_prompt.to_string_lossy().as_ref())?;
                }
                gen_kwargs.set_item("use_torch_compile", false)?;
                gen_kwargs.set_item("verbose", false)?;

                let output = model.call_method("generate", (input,), Some(&gen_kwargs))?;

                if let Some(parent) = output_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                model.call_method1(
                    "save_audio",
                    (output_path.to_string_lossy().as_ref(), output),
                )?;
                Ok(())
            },
        )?;

        if options.clear {
            release_model(py, &mut slot, device)?;
        }

        Ok(())
    })
}

#[async_trait]
impl TtsBackend for DiaBackend {
    async fn synthesize(
        &self,
        text: &str,
        output_path: &Path,
        options: &TtsOptions,
    ) -> Result<()> {
        let text = text.to_string();
        let output_path = output_path.to_path_buf();
        let options = options.clone();
        let device = self.device.clone();
        let model = Arc::clone(&self.model);

        // Python holds the GIL for the whole generation; keep it off the runtime threads.
        tokio::task::spawn_blocking(move || {
            generate_audio_sync(&model, &device, &text, &output_path, &options)
        })
        .await
        .context("Task join error")??;

        Ok(())
    }

    fn release(&self) {
        let Ok(mut slot) = self.model.lock() else {
            return;
        };
        let result = Python::with_gil(|py| release_model(py, &mut slot, &self.device));
        if let Err(e) = result {
            log::warn!("Failed to release Dia model: {}", e);
        }
    }

    fn device(&self) -> &str {
        &self.device
    }
}
