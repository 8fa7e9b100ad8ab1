//! Word-count chunking of extracted document text.

use std::num::NonZeroUsize;
use std::str::SplitWhitespace;

/// Default chunk size in words.
pub const DEFAULT_CHUNK_WORDS: usize = 350;

/// Lazy iterator over word-bounded chunks of a text.
///
/// Each item joins up to `chunk_size` whitespace-delimited tokens with single
/// spaces. A clone resumes from the same position, so cloning before
/// consuming walks the same sequence twice.
#[derive(Debug, Clone)]
pub struct WordChunks<'a> {
    words: SplitWhitespace<'a>,
    chunk_size: usize,
}

/// Split `text` into chunks of `chunk_size` words.
///
/// Empty or whitespace-only text yields no chunks. The final chunk may be
/// shorter than `chunk_size`.
pub fn chunk_words(text: &str, chunk_size: NonZeroUsize) -> WordChunks<'_> {
    WordChunks {
        words: text.split_whitespace(),
        chunk_size: chunk_size.get(),
    }
}

impl Iterator for WordChunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let first = self.words.next()?;
        let mut chunk = String::from(first);

        for word in self.words.by_ref().take(self.chunk_size - 1) {
            chunk.push(' ');
            chunk.push_str(word);
        }

        Some(chunk)
    }
}

impl std::iter::FusedIterator for WordChunks<'_> {}
