//! Podcast script generation from the cleaned document.

use llm_client::{GenerationParams, LlmRequest, ModelHandle};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::Script;
use super::prompt::build_script_prompt;

/// Reasoning blocks emitted by thinking models.
static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("think-block pattern is valid")
});

const SCRIPT_MAX_TOKENS: u32 = 4096;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Could not generate podcast script: {0}")]
    Inference(#[from] llm_client::LlmError),

    #[error("Model returned no script text")]
    Empty,
}

fn script_params() -> GenerationParams {
    GenerationParams::new()
        .with_max_tokens(SCRIPT_MAX_TOKENS)
        .with_temperature(0.7)
        .with_top_p(0.9)
        .with_min_p(0.0)
        .with_thinking(true)
}

/// Strip reasoning blocks and emphasis markup from raw model output.
pub fn clean_script_output(raw: &str) -> String {
    THINK_BLOCK
        .replace_all(raw, "")
        .replace('*', "")
        .trim()
        .to_string()
}

/// Write a two-host script for `cleaned_text` with a single model call.
///
/// When `clear` is set the model is released whether or not the call
/// succeeded.
pub async fn generate_script(
    model: &mut ModelHandle,
    cleaned_text: &str,
    clear: bool,
) -> Result<Script, ScriptError> {
    let request = LlmRequest::new(build_script_prompt(cleaned_text)).with_params(script_params());

    log::info!("Generating script with {}", model.label());
    let outcome = model.complete(request).await;

    if clear {
        model.release();
    }

    let response = outcome?;
    let text = clean_script_output(&response.content);
    if text.is_empty() {
        return Err(ScriptError::Empty);
    }

    Ok(Script::new(text))
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

    #[test]
    fn test_strips_think_blocks_and_emphasis() {
        let raw = "<think>\nplan the *hook*\n</think>\n**Chris**: Wow.\n<think>again</think>**Sam**: Yes.";
        assert_eq!(clean_script_output(raw), "Chris: Wow.\nSam: Yes.");
    }

    #[test]
    fn test_think_removal_is_not_greedy() {
        let raw = "<think>a</think>keep<think>b</think>";
        assert_eq!(clean_script_output(raw), "keep");
    }

    #[test]
    fn test_unclosed_think_is_left_alone() {
        assert_eq!(clean_script_output("<think>oops Chris: hi"), "<think>oops Chris: hi");
    }

    #[tokio::test]
    async fn test_generate_script_success() {
        let mock = Arc::new(MockProvider::always_succeeds(
            "<think>outline</think>\n**Chris**: Hello there.\n**Sam**: Hi Chris!",
        ));
        let mut model = mock_handle(&mock);

        let script = generate_script(&mut model, "Cleaned context.", true).await.unwrap();

        assert_eq!(script.text(), "Chris: Hello there.\nSam: Hi Chris!");
        assert_eq!(mock.call_count(), 1);
        assert!(!model.is_loaded());

        let request = &mock.requests()[0];
        assert!(request.prompt.contains("Cleaned context."));
        assert!(request.system_prompt.is_none());
        assert_eq!(request.params, script_params());
    }

    #[tokio::test]
    async fn test_generate_script_failure_is_typed_and_releases() {
        let mock = Arc::new(MockProvider::always_fails("model crashed"));
        let mut model = mock_handle(&mock);

        let result = generate_script(&mut model, "context", true).await;

        assert!(matches!(result, Err(ScriptError::Inference(_))));
        assert_eq!(model.load_count(), 1);
        assert!(!model.is_loaded());
    }

    #[tokio::test]
    async fn test_keep_model_when_not_clearing() {
        let mock = Arc::new(MockProvider::always_fails("model crashed"));
        let mut model = mock_handle(&mock);

        let _ = generate_script(&mut model, "context", false).await;
        assert!(model.is_loaded());
    }

    #[tokio::test]
    async fn test_reasoning_only_output_is_empty() {
        let mock = Arc::new(MockProvider::always_succeeds("<think>nothing to say</think>\n**"));
        let mut model = mock_handle(&mock);

        let result = generate_script(&mut model, "context", true).await;
        assert!(matches!(result, Err(ScriptError::Empty)));
    }
}
