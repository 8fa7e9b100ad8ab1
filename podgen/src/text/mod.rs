//! Text preparation: word chunking and model-driven cleanup.

pub mod chunker;
pub mod normalizer;

pub use chunker::{DEFAULT_CHUNK_WORDS, chunk_words};
pub use normalizer::normalize_chunks;
