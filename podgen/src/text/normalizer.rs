//! Chunk-by-chunk cleanup of extracted text with a language model.

use llm_client::{GenerationParams, LlmRequest, ModelHandle};

/// Instruction sent with every chunk.
pub const CLEANUP_PROMPT: &str = "You are a text pre-processor. \
I will give you raw text extracted from a PDF. \
Clean the text and return it without changing its content. \
The raw text sometimes contains formatting issues, citations, LaTeX math and similar artifacts; remove them. \
Remove citations, stray numbers in between sentences, and links. Decide what to keep and what to drop. \
Do not change the content in any way, only clean it up and present it in a readable form. \
Do not add markdown formatting or any other special characters; return plain text only. \
Start your response directly with the processed text. Do not ask questions or acknowledge the request. \
Your output is used as the final text as-is.";

/// Output budget for one cleaned chunk.
const CLEANUP_MAX_TOKENS: u32 = 2048;

/// Cleanup result for one chunk position.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanedSegment {
    /// Text rewritten by the model
    Cleaned(String),
    /// The model call failed; the raw chunk stands in for the cleaned text
    Fallback { original: String, error: String },
}

impl CleanedSegment {
    /// Text to use at this position.
    pub fn text(&self) -> &str {
        match self {
            CleanedSegment::Cleaned(text) => text,
            CleanedSegment::Fallback { original, .. } => original,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CleanedSegment::Fallback { .. })
    }
}

/// Ordered cleaned segments, one per source chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedDocument {
    pub segments: Vec<CleanedSegment>,
}

impl CleanedDocument {
    /// Every segment followed by a blank line, in chunk order.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for segment in &self.segments {
            text.push_str(segment.text());
            text.push_str("\n\n");
        }
        text
    }

    /// Number of positions that kept their raw chunk.
    pub fn fallback_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_fallback()).count()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

fn cleanup_request(chunk: &str) -> LlmRequest {
    LlmRequest::new(chunk)
        .with_system(CLEANUP_PROMPT)
        .with_params(
            GenerationParams::new()
                .with_max_tokens(CLEANUP_MAX_TOKENS)
                .with_thinking(false),
        )
}

/// Clean one chunk, falling back to the raw text on any inference error.
pub async fn normalize_chunk(model: &mut ModelHandle, chunk: String) -> CleanedSegment {
    match model.complete(cleanup_request(&chunk)).await {
        Ok(response) => CleanedSegment::Cleaned(response.content),
        Err(e) => {
            log::warn!("Error processing chunk with LLM, keeping raw text: {}", e);
            CleanedSegment::Fallback {
                original: chunk,
                error: e.to_string(),
            }
        }
    }
}

/// Clean every chunk in order.
///
/// A failed chunk never aborts the document. When `clear` is set the model is
/// released once all chunks are done. `on_progress(done, total)` is called
/// after each chunk.
pub async fn normalize_chunks<I, F>(
    model: &mut ModelHandle,
    chunks: I,
    clear: bool,
    mut on_progress: F,
) -> CleanedDocument
where
    I: IntoIterator<Item = String>,
    F: FnMut(usize, usize),
{
    let chunks: Vec<String> = chunks.into_iter().collect();
    let total = chunks.len();
    let mut segments = Vec::with_capacity(total);

    for (i, chunk) in chunks.into_iter().enumerate() {
        log::debug!("Processing chunk {}/{}", i + 1, total);
        segments.push(normalize_chunk(model, chunk).await);
        on_progress(i + 1, total);
    }

    if clear {
        model.release();
    }

    CleanedDocument { segments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::{LlmProvider, MockProvider};
    use std::sync::Arc;

    fn mock_handle(mock: &Arc<MockProvider>) -> ModelHandle {
        let mock = Arc::clone(mock);
        ModelHandle::with_loader("mock", move || {
            Ok(Box::new(Arc::clone(&mock)) as Box<dyn LlmProvider>)
        })
    }

    fn chunks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_all_chunks_cleaned_in_order() {
        let mock = Arc::new(MockProvider::uppercase_except(&[]));
        let mut model = mock_handle(&mock);

        let doc = normalize_chunks(&mut model, chunks(&["one two", "three"]), true, |_, _| {}).await;

        assert_eq!(doc.text(), "ONE TWO\n\nTHREE\n\n");
        assert_eq!(doc.fallback_count(), 0);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_chunk_falls_back_to_original() {
        let mock = Arc::new(MockProvider::uppercase_except(&[1]));
        let mut model = mock_handle(&mock);

        let doc = normalize_chunks(
            &mut model,
            chunks(&["alpha beta", "gamma delta", "epsilon"]),
            true,
            |_, _| {},
        )
        .await;

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.segments[0], CleanedSegment::Cleaned("ALPHA BETA".to_string()));
        assert!(doc.segments[1].is_fallback());
        assert_eq!(doc.segments[1].text(), "gamma delta");
        assert_eq!(doc.segments[2].text(), "EPSILON");
        assert_eq!(doc.fallback_count(), 1);
        assert_eq!(doc.text(), "ALPHA BETA\n\ngamma delta\n\nEPSILON\n\n");
    }

    #[tokio::test]
    async fn test_requests_carry_cleanup_instruction() {
        let mock = Arc::new(MockProvider::uppercase_except(&[]));
        let mut model = mock_handle(&mock);

        normalize_chunks(&mut model, chunks(&["raw [12] text"]), false, |_, _| {}).await;

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "raw [12] text");
        assert_eq!(requests[0].system_prompt.as_deref(), Some(CLEANUP_PROMPT));
        assert_eq!(requests[0].params.max_tokens, Some(2048));
        assert_eq!(requests[0].params.thinking, Some(false));
    }

    #[tokio::test]
    async fn test_clear_flag_controls_release() {
        let mock = Arc::new(MockProvider::uppercase_except(&[]));

        let mut kept = mock_handle(&mock);
        normalize_chunks(&mut kept, chunks(&["a", "b"]), false, |_, _| {}).await;
        assert!(kept.is_loaded());
        assert_eq!(kept.load_count(), 1);

        let mut cleared = mock_handle(&mock);
        normalize_chunks(&mut cleared, chunks(&["a", "b"]), true, |_, _| {}).await;
        assert!(!cleared.is_loaded());
        assert_eq!(cleared.load_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_model_keeps_every_chunk() {
        let mut model = ModelHandle::with_loader("offline", || {
            Err(llm_client::LlmError::ProviderUnavailable("server down".into()))
        });

        let doc = normalize_chunks(&mut model, chunks(&["a b", "c"]), true, |_, _| {}).await;

        assert_eq!(doc.fallback_count(), 2);
        assert_eq!(doc.text(), "a b\n\nc\n\n");
    }

    #[tokio::test]
    async fn test_progress_reports_each_chunk() {
        let mock = Arc::new(MockProvider::uppercase_except(&[]));
        let mut model = mock_handle(&mock);
        let mut seen = Vec::new();

        normalize_chunks(&mut model, chunks(&["a", "b", "c"]), true, |done, total| {
            seen.push((done, total))
        })
        .await;

        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let mock = Arc::new(MockProvider::uppercase_except(&[]));
        let mut model = mock_handle(&mock);

        let doc = normalize_chunks(&mut model, Vec::<String>::new(), true, |_, _| {}).await;

        assert!(doc.segments.is_empty());
        assert_eq!(doc.text(), "");
        assert_eq!(mock.call_count(), 0);
        assert_eq!(model.load_count(), 0);
    }
}
