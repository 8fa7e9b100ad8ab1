//! OpenAI-compatible chat completions provider
//!
//! Covers hosted services (OpenRouter, Cerebras) and local servers such as
//! `mlx_lm.server`, llama.cpp or vLLM that serve the same endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::provider::{GenerationParams, LlmProvider, LlmRequest, LlmResponse, TokenUsage};

/// Provider for OpenAI-compatible APIs
pub struct OpenAICompatibleProvider {
    model: String,
    base_url: String,
    api_key: Option<String>,
    name: &'static str,
    /// Local servers accept the non-standard `min_p` and chat template switches
    extended_sampling: bool,
    client: Client,
}

impl OpenAICompatibleProvider {
    /// Create a new OpenAI-compatible provider
    pub fn new(
        model: &str,
        base_url: &str,
        api_key: Option<String>,
        name: &'static str,
    ) -> Result<Self> {
        Ok(Self {
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            name,
            extended_sampling: false,
            client: Client::new(),
        })
    }

    /// Create a provider for a locally hosted model server
    pub fn local(model: &str, base_url: &str, api_key: Option<String>) -> Result<Self> {
        let mut provider = Self::new(model, base_url, api_key, "Local server")?;
        provider.extended_sampling = true;
        Ok(provider)
    }

    /// Create an OpenRouter provider
    pub fn openrouter(model: &str, api_key: String) -> Result<Self> {
        Self::new(model, "https://openrouter.ai/api/v1", Some(api_key), "OpenRouter")
    }

    /// Create a Cerebras provider
    pub fn cerebras(model: &str, api_key: String) -> Result<Self> {
        Self::new(model, "https://api.cerebras.ai/v1", Some(api_key), "Cerebras")
    }

    fn build_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        let mut messages = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(Message {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.push(Message {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let GenerationParams {
            max_tokens,
            temperature,
            top_p,
            min_p,
            thinking,
        } = request.params.clone();

        let (min_p, chat_template_kwargs) = if self.extended_sampling {
            (
                min_p,
                thinking.map(|enable_thinking| ChatTemplateKwargs { enable_thinking }),
            )
        } else {
            (None, None)
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
            temperature,
            top_p,
            min_p,
            chat_template_kwargs,
        }
    }
}

// OpenAI API request/response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_template_kwargs: Option<ChatTemplateKwargs>,
}

#[derive(Debug, Serialize)]
struct ChatTemplateKwargs {
    enable_thinking: bool,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl LlmProvider for OpenAICompatibleProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let chat_request = self.build_request(&request);
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| LlmError::ApiError {
                message: format!("Request to {} failed: {}", self.name, e),
                status_code: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message =
                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            return Err(LlmError::ApiError {
                message,
                status_code: Some(status.as_u16()),
            });
        }

        let chat_response: ChatCompletionResponse =
            response.json().await.map_err(|e| LlmError::ApiError {
                message: format!("Failed to parse response: {}", e),
                status_code: None,
            })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::EmptyResponse {
                model: self.model.clone(),
            })?;

        let usage = chat_response.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            usage,
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> LlmRequest {
        LlmRequest::new("raw chunk")
            .with_system("clean it")
            .with_params(
                GenerationParams::new()
                    .with_max_tokens(4096)
                    .with_temperature(0.7)
                    .with_top_p(0.9)
                    .with_min_p(0.0)
                    .with_thinking(true),
            )
    }

    #[test]
    fn test_local_request_carries_extended_sampling() {
        let provider = OpenAICompatibleProvider::local("qwen", "http://localhost:8080/v1/", None)
            .unwrap();
        assert_eq!(provider.base_url, "http://localhost:8080/v1");

        let body = serde_json::to_value(provider.build_request(&sample_request())).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "raw chunk");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["min_p"], 0.0);
        assert_eq!(body["chat_template_kwargs"]["enable_thinking"], true);
    }

    #[test]
    fn test_hosted_request_omits_nonstandard_fields() {
        let provider = OpenAICompatibleProvider::openrouter("qwen", "key".to_string()).unwrap();
        let body = serde_json::to_value(provider.build_request(&sample_request())).unwrap();
        assert!(body.get("min_p").is_none());
        assert!(body.get("chat_template_kwargs").is_none());
        assert_eq!(body["max_tokens"], 4096);
    }

    #[test]
    fn test_unset_params_are_skipped() {
        let provider = OpenAICompatibleProvider::cerebras("llama", "key".to_string()).unwrap();
        let body = serde_json::to_value(provider.build_request(&LlmRequest::new("hi"))).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }
}
