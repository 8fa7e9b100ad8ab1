//! Text-generation client for the podgen workspace
//!
//! Provides a unified interface for the model-backed pipeline stages:
//! - Local OpenAI-compatible servers (mlx_lm.server, llama.cpp, vLLM)
//! - Claude CLI (subprocess)
//! - Anthropic API (direct)
//! - OpenRouter and Cerebras
//!
//! Stages hold a [`ModelHandle`], which acquires the provider on first use and
//! releases it on request or on drop.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod providers;

pub use config::{CLEANUP_PROGRAM, Config, ModelPreset, ProviderConfig, SCRIPT_PROGRAM};
pub use error::{LlmError, Result};
pub use model::ModelHandle;
pub use provider::{GenerationParams, LlmProvider, LlmRequest, LlmResponse, TokenUsage};
pub use providers::{MockProvider, ProviderKind, get_provider};
