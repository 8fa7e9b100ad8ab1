//! Conversion of a labeled script into paired, speaker-tagged dialogue turns.

use thiserror::Error;

/// Script label of the first host and the synthesis marker that replaces it.
pub const SPEAKER_ONE: (&str, &str) = ("Chris:", "[S1]");

/// Script label of the second host and the synthesis marker that replaces it.
pub const SPEAKER_TWO: (&str, &str) = ("Sam:", "[S2]");

/// What to do with a line that starts with neither speaker label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnlabeledLines {
    /// Keep the line verbatim; it is paired like any other line
    #[default]
    PassThrough,
    /// Fail on the first such line
    Reject,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DialogueError {
    #[error("Line {line_number} has no speaker label: {line:?}")]
    UnlabeledLine { line_number: usize, line: String },
}

/// Turns a script into dialogue turns for the speech synthesizer.
#[derive(Debug, Clone, Default)]
pub struct DialogueAssembler {
    unlabeled: UnlabeledLines,
}

impl DialogueAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unlabeled(mut self, policy: UnlabeledLines) -> Self {
        self.unlabeled = policy;
        self
    }

    /// Tag every non-empty line, then pair lines two at a time.
    ///
    /// Turn `k` is line `2k` and line `2k + 1` joined by a space; an odd last
    /// line becomes a turn on its own.
    pub fn assemble(&self, script: &str) -> Result<Vec<String>, DialogueError> {
        let mut lines = Vec::new();

        for (index, raw) in script.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            match tag_line(line) {
                Some(tagged) => lines.push(tagged),
                None if self.unlabeled == UnlabeledLines::Reject => {
                    return Err(DialogueError::UnlabeledLine {
                        line_number: index + 1,
                        line: line.to_string(),
                    });
                }
                None => {
                    log::debug!("Line {} has no speaker label, keeping it", index + 1);
                    lines.push(line.to_string());
                }
            }
        }

        Ok(pair_lines(lines))
    }
}

/// Replace a leading speaker label with its synthesis marker.
fn tag_line(line: &str) -> Option<String> {
    [SPEAKER_ONE, SPEAKER_TWO]
        .iter()
        .find_map(|(label, marker)| {
            line.strip_prefix(label).map(|rest| match rest.trim_start() {
                "" => marker.to_string(),
                rest => format!("{} {}", marker, rest),
            })
        })
}

fn pair_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .chunks(2)
        .map(|pair| pair.join(" "))
        .collect()
}

/// Assemble with the default pass-through policy, which cannot fail.
pub fn convert_to_dialogues(script: &str) -> Vec<String> {
    // Pass-through never rejects a line.
    DialogueAssembler::new().assemble(script).unwrap_or_default()
}
