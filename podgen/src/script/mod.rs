//! Podcast script: generation, storage and conversion into dialogue turns.

pub mod dialogue;
pub mod generator;
pub mod prompt;

pub use dialogue::{DialogueAssembler, UnlabeledLines, convert_to_dialogues};
pub use generator::generate_script;

use anyhow::{Context, Result};
use std::path::Path;

/// A two-host script, one `Speaker: line` per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    text: String,
}

impl Script {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read a pre-written script file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;
        Ok(Self::new(text))
    }

    /// Write the raw script text, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, &self.text)
            .with_context(|| format!("Failed to write script: {}", path.display()))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of non-empty lines.
    pub fn line_count(&self) -> usize {
        self.text.lines().filter(|l| !l.trim().is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("paper_script.txt");

        let script = Script::new("Chris: Hi.\n\nSam: Hello.");
        script.save(&path).unwrap();

        let loaded = Script::load(&path).unwrap();
        assert_eq!(loaded, script);
        assert_eq!(loaded.line_count(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Script::load(Path::new("/nonexistent/script.txt"));
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Failed to read script"));
    }
}
