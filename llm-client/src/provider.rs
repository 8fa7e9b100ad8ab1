use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Sampling and length controls for a single generation.
///
/// `None` leaves the choice to the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub min_p: Option<f32>,
    /// Ask reasoning models to think before answering (Qwen3-style chat templates).
    pub thinking: Option<bool>,
}

impl GenerationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_min_p(mut self, min_p: f32) -> Self {
        self.min_p = Some(min_p);
        self
    }

    pub fn with_thinking(mut self, thinking: bool) -> Self {
        self.thinking = Some(thinking);
        self
    }
}

/// Request to send to an LLM provider: one optional system instruction and
/// one user turn.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub params: GenerationParams,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            params: GenerationParams::default(),
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a completion request
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Get the provider name for display
    fn name(&self) -> &'static str;

    /// Check if the provider is available (API key set, CLI installed, etc.)
    fn is_available(&self) -> Result<()>;
}

#[async_trait]
impl<T: LlmProvider + ?Sized> LlmProvider for Arc<T> {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        (**self).complete(request).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> Result<()> {
        (**self).is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::new("chunk")
            .with_system("clean this")
            .with_params(GenerationParams::new().with_max_tokens(2048).with_thinking(false));

        assert_eq!(request.prompt, "chunk");
        assert_eq!(request.system_prompt.as_deref(), Some("clean this"));
        assert_eq!(request.params.max_tokens, Some(2048));
        assert_eq!(request.params.thinking, Some(false));
        assert!(request.params.temperature.is_none());
    }

    #[test]
    fn test_default_params_are_unset() {
        let params = GenerationParams::default();
        assert_eq!(params, GenerationParams::new());
        assert!(params.max_tokens.is_none());
        assert!(params.top_p.is_none());
        assert!(params.min_p.is_none());
    }
}
