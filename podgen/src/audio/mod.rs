//! Audio composition: per-turn synthesis, concatenation and speed change.

pub mod compositor;
mod speed;
pub mod wav;

pub use compositor::{DEFAULT_SILENCE_MS, compose_track, synthesize_turns};
pub use speed::change_speed;
