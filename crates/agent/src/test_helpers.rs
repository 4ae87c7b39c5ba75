//! Shared test helpers for conversation and assistant tests.

use convoy_core::error::ProviderError;
use convoy_core::provider::{CompletionRequest, CompletionResponse, Provider, Usage};
use convoy_core::tool::ToolInvocationRequest;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and records
/// the request. Once the script runs out every call fails.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
    native: bool,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            native: false,
        }
    }

    /// Advertise native tool calling.
    pub fn native(mut self) -> Self {
        self.native = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    fn supports_native_tools(&self) -> bool {
        self.native
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        let responses = self.responses.lock().unwrap();
        responses.get(call - 1).cloned().ok_or_else(|| {
            ProviderError::Unknown(format!(
                "no more scripted responses (call #{call}, have {})",
                responses.len()
            ))
        })
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> CompletionResponse {
    CompletionResponse::text("mock-model", text).with_usage(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a response with native tool calls and optional thought content.
pub fn make_tool_call_response(calls: Vec<ToolInvocationRequest>, thought: &str) -> CompletionResponse {
    make_text_response(thought).with_tool_requests(calls)
}
