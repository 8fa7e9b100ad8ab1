//! Scoped model handles.
//!
//! A pipeline stage owns a [`ModelHandle`] instead of reaching for a shared
//! global model. The provider is acquired on the first request and dropped by
//! [`ModelHandle::release`] or when the handle itself goes out of scope, so
//! two large models are never held at the same time.

use crate::config::{ModelPreset, ProviderConfig};
use crate::error::Result;
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::providers::get_provider;

type Loader = Box<dyn Fn() -> Result<Box<dyn LlmProvider>> + Send + Sync>;

/// Lazily acquired, explicitly released LLM provider
pub struct ModelHandle {
    label: String,
    loader: Loader,
    provider: Option<Box<dyn LlmProvider>>,
    loads: usize,
}

impl ModelHandle {
    /// Handle that builds its provider from a preset on first use
    pub fn from_preset(preset: ModelPreset, provider_config: Option<ProviderConfig>) -> Self {
        let label = format!("{}/{}", preset.provider, preset.model);
        Self::with_loader(label, move || get_provider(&preset, provider_config.as_ref()))
    }

    /// Handle with a custom loader
    pub fn with_loader<F>(label: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn LlmProvider>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            loader: Box::new(loader),
            provider: None,
            loads: 0,
        }
    }

    /// Display label, `provider/model` for preset handles
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether a provider is currently held
    pub fn is_loaded(&self) -> bool {
        self.provider.is_some()
    }

    /// How many times the provider has been acquired
    pub fn load_count(&self) -> usize {
        self.loads
    }

    /// Acquire the provider if it is not held yet
    pub fn acquire(&mut self) -> Result<&dyn LlmProvider> {
        let provider = match self.provider.take() {
            Some(provider) => provider,
            None => {
                log::debug!("Loading model {}", self.label);
                let provider = (self.loader)()?;
                provider.is_available()?;
                self.loads += 1;
                provider
            }
        };

        Ok(&**self.provider.insert(provider))
    }

    /// Run one completion, acquiring the provider first if needed
    pub async fn complete(&mut self, request: LlmRequest) -> Result<LlmResponse> {
        let provider = self.acquire()?;
        let response = provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            log::debug!(
                "{}: {} tokens in, {} out",
                self.label,
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(response)
    }

    /// Drop the provider. The next request loads it again.
    pub fn release(&mut self) {
        if self.provider.take().is_some() {
            log::debug!("Released model {}", self.label);
        }
    }
}

impl Drop for ModelHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("label", &self.label)
            .field("loaded", &self.is_loaded())
            .field("loads", &self.loads)
            .finish()
    }
}
