//! Claude CLI provider
//!
//! Runs the installed `claude` binary in print mode as a subprocess.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

/// Provider that uses the Claude CLI (subprocess)
pub struct ClaudeCliProvider {
    model: String,
    cli_path: PathBuf,
}

impl ClaudeCliProvider {
    /// Create a new Claude CLI provider
    ///
    /// Returns an error if the Claude CLI is not found.
    pub fn new(model: &str, cli_path: Option<PathBuf>) -> Result<Self> {
        let cli_path = match cli_path {
            Some(path) => {
                if !path.exists() {
                    return Err(LlmError::ProviderUnavailable(format!(
                        "Claude CLI not found at specified path: {}",
                        path.display()
                    )));
                }
                path
            }
            None => which::which("claude").map_err(|_| {
                LlmError::ProviderUnavailable("Claude CLI not found in PATH".into())
            })?,
        };

        Ok(Self {
            model: model.to_string(),
            cli_path,
        })
    }

    /// Command-line arguments for a request. Sampling parameters have no CLI
    /// equivalent and are dropped.
    fn build_args(&self, request: &LlmRequest) -> Vec<String> {
        let mut args = vec!["--model".to_string(), self.model.clone()];

        if let Some(system) = &request.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(system.clone());
        }

        args.push("--print".to_string());
        args.push(request.prompt.clone());
        args
    }
}

#[async_trait]
impl LlmProvider for ClaudeCliProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let output = Command::new(&self.cli_path)
            .args(self.build_args(&request))
            .output()
            .await
            .map_err(|e| LlmError::ClaudeCliError(format!("Failed to execute: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LlmError::ClaudeCliError(format!(
                "Command failed: {}",
                stderr
            )));
        }

        let content = String::from_utf8(output.stdout)
            .map_err(|e| LlmError::ClaudeCliError(format!("Invalid UTF-8: {}", e)))?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(LlmError::EmptyResponse {
                model: self.model.clone(),
            });
        }

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        "Claude CLI"
    }

    fn is_available(&self) -> Result<()> {
        // Availability was checked in constructor
        Ok(())
    }
}
