//! Mock LLM provider for testing
//!
//! Replies are produced by a responder closure that sees the zero-based call
//! index and the request, so tests can fail chosen calls or echo input back.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

type Responder = Box<dyn Fn(usize, &LlmRequest) -> Result<String> + Send + Sync>;

/// A mock provider with scripted replies
pub struct MockProvider {
    responder: Responder,
    call_count: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
    name: &'static str,
}

impl MockProvider {
    /// Create a provider driven by a custom responder
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(usize, &LlmRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            name: "mock",
        }
    }

    /// Create a provider that always replies with `response`
    pub fn always_succeeds(response: &str) -> Self {
        let response = response.to_string();
        Self::with_responder(move |_, _| Ok(response.clone()))
    }

    /// Create a provider that always fails with an API error carrying `message`
    pub fn always_fails(message: &str) -> Self {
        let message = message.to_string();
        Self::with_responder(move |_, _| Err(api_error(&message)))
    }

    /// Create a provider that replies with the upper-cased prompt, failing
    /// the calls whose indices are listed in `failing_calls`
    pub fn uppercase_except(failing_calls: &[usize]) -> Self {
        let failing_calls = failing_calls.to_vec();
        Self::with_responder(move |call, request| {
            if failing_calls.contains(&call) {
                Err(api_error(&format!("forced failure on call {}", call)))
            } else {
                Ok(request.prompt.to_uppercase())
            }
        })
    }

    /// Get the number of times complete() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Set a custom provider name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

fn api_error(message: &str) -> LlmError {
    LlmError::ApiError {
        message: message.to_string(),
        status_code: Some(500),
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        let reply = (self.responder)(call, &request);

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        Ok(LlmResponse {
            content: reply?,
            model: "mock-model".to_string(),
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}
