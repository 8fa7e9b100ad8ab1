use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{LlmError, Result};

/// Program key for the chunk cleanup stage.
pub const CLEANUP_PROGRAM: &str = "podgen-cleanup";

/// Program key for the script writing stage.
pub const SCRIPT_PROGRAM: &str = "podgen-script";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Preset used when neither a flag nor a per-program default names one
    #[serde(default = "default_preset")]
    pub default_preset: String,

    /// Per-program default presets (program name -> preset name)
    #[serde(default)]
    pub defaults: HashMap<String, String>,

    /// Named model presets for quick access
    #[serde(default)]
    pub presets: HashMap<String, ModelPreset>,

    /// Provider-specific configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_preset() -> String {
    "qwen3-8b".to_string()
}

/// A named model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPreset {
    /// Provider identifier (local, claude-cli, anthropic, openrouter, cerebras)
    pub provider: String,

    /// Model name/identifier for the provider
    pub model: String,
}

impl ModelPreset {
    pub fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
        }
    }
}

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (optional, can use env var instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Path to CLI binary (for claude-cli provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_path: Option<PathBuf>,

    /// Custom base URL (for API providers and local servers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::parse(&content)
    }

    /// Parse a config file, filling in built-in presets and stage defaults
    /// the file does not define.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config.with_builtins())
    }

    fn with_builtins(mut self) -> Self {
        let builtin = Self::default();
        for (name, preset) in builtin.presets {
            self.presets.entry(name).or_insert(preset);
        }
        for (program, preset) in builtin.defaults {
            self.defaults.entry(program).or_insert(preset);
        }
        self
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home =
            std::env::var("HOME").map_err(|_| LlmError::ConfigError("HOME not set".into()))?;
        Ok(PathBuf::from(home).join(".config/cli-programs/llm.toml"))
    }

    /// Get a preset by name
    pub fn get_preset(&self, name: &str) -> Result<&ModelPreset> {
        self.presets
            .get(name)
            .ok_or_else(|| LlmError::InvalidPreset(name.to_string()))
    }

    /// Get the default preset name for a specific program
    ///
    /// Falls back to `default_preset` if no program-specific default is set.
    pub fn get_default_for_program(&self, program: &str) -> &str {
        self.defaults
            .get(program)
            .map(String::as_str)
            .unwrap_or(&self.default_preset)
    }

    /// Get provider config by provider name
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider)
    }

    /// Resolve the preset a pipeline stage should use.
    ///
    /// An explicit preset name wins over the program default.
    pub fn resolve(
        &self,
        program: &str,
        explicit: Option<&str>,
    ) -> Result<(ModelPreset, Option<ProviderConfig>)> {
        let name = explicit.unwrap_or_else(|| self.get_default_for_program(program));
        let preset = self.get_preset(name)?.clone();
        let provider_config = self.get_provider_config(&preset.provider).cloned();
        Ok((preset, provider_config))
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut presets = HashMap::new();

        // Small model for per-chunk cleanup, larger one for script writing.
        presets.insert(
            "qwen3-1.7b".to_string(),
            ModelPreset::new("local", "mlx-community/Qwen3-1.7B-8bit"),
        );
        presets.insert(
            "qwen3-8b".to_string(),
            ModelPreset::new("local", "mlx-community/Qwen3-8B-4bit"),
        );
        presets.insert(
            "claude-cli".to_string(),
            ModelPreset::new("claude-cli", "sonnet"),
        );

        let mut defaults = HashMap::new();
        defaults.insert(CLEANUP_PROGRAM.to_string(), "qwen3-1.7b".to_string());
        defaults.insert(SCRIPT_PROGRAM.to_string(), "qwen3-8b".to_string());

        Self {
            default_preset: default_preset(),
            defaults,
            presets,
            providers: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_preset, "qwen3-8b");

        let preset = config.get_preset("qwen3-1.7b").unwrap();
        assert_eq!(preset.provider, "local");
        assert_eq!(preset.model, "mlx-community/Qwen3-1.7B-8bit");
    }

    #[test]
    fn test_invalid_preset() {
        let config = Config::default();
        let result = config.get_preset("nonexistent");
        assert!(matches!(result, Err(LlmError::InvalidPreset(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_preset, config.default_preset);
        assert_eq!(parsed.presets, config.presets);
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path().unwrap();
        assert!(path.ends_with(".config/cli-programs/llm.toml"));
    }

    #[test]
    fn test_stage_defaults() {
        let config = Config::default();
        assert_eq!(config.get_default_for_program(CLEANUP_PROGRAM), "qwen3-1.7b");
        assert_eq!(config.get_default_for_program(SCRIPT_PROGRAM), "qwen3-8b");
        assert_eq!(config.get_default_for_program("other-tool"), "qwen3-8b");
    }

    #[test]
    fn test_resolve_prefers_explicit_preset() {
        let mut config = Config::default();
        config.providers.insert(
            "claude-cli".to_string(),
            ProviderConfig {
                cli_path: Some(PathBuf::from("/usr/local/bin/claude")),
                ..Default::default()
            },
        );

        let (preset, provider_config) = config.resolve(SCRIPT_PROGRAM, Some("claude-cli")).unwrap();
        assert_eq!(preset, ModelPreset::new("claude-cli", "sonnet"));
        assert_eq!(
            provider_config.and_then(|c| c.cli_path),
            Some(PathBuf::from("/usr/local/bin/claude"))
        );

        let (preset, provider_config) = config.resolve(CLEANUP_PROGRAM, None).unwrap();
        assert_eq!(preset.model, "mlx-community/Qwen3-1.7B-8bit");
        assert!(provider_config.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[presets.fast]
provider = "cerebras"
model = "llama3.1-8b"

[defaults]
podgen-cleanup = "fast"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_preset, "qwen3-8b");
        let (preset, _) = config.resolve(CLEANUP_PROGRAM, None).unwrap();
        assert_eq!(preset.provider, "cerebras");
    }

    #[test]
    fn test_shared_config_without_podgen_entries() {
        let toml_str = r#"
default_preset = "fast"

[presets.fast]
provider = "cerebras"
model = "llama3.1-8b"

[defaults]
bookmarks = "fast"
"#;
        let config = Config::parse(toml_str).unwrap();
        let (preset, _) = config.resolve(CLEANUP_PROGRAM, None).unwrap();
        assert_eq!(preset, ModelPreset::new("local", "mlx-community/Qwen3-1.7B-8bit"));
        let (preset, _) = config.resolve(SCRIPT_PROGRAM, None).unwrap();
        assert_eq!(preset.model, "mlx-community/Qwen3-8B-4bit");
        assert_eq!(config.get_default_for_program("bookmarks"), "fast");
    }

    #[test]
    fn test_user_presets_override_builtins() {
        let toml_str = r#"
[presets.qwen3-8b]
provider = "claude-cli"
model = "opus"
"#;
        let config = Config::parse(toml_str).unwrap();
        let (preset, _) = config.resolve(SCRIPT_PROGRAM, None).unwrap();
        assert_eq!(preset, ModelPreset::new("claude-cli", "opus"));
    }
}
