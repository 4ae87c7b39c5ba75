//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get a response
//! back, either as a complete response or as a stream of events.
//!
//! Vendor adapters live outside this workspace; only the contract is here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::options::GenerationOptions;
use crate::tool::ToolInvocationRequest;

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Everything a provider needs for one model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use
    pub model: String,

    /// System prompt, sent separately from the thread
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Sampling options
    #[serde(default)]
    pub options: GenerationOptions,

    /// Available tools (only populated for providers with native tool calling)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            messages,
            options: GenerationOptions::default(),
            tools: Vec::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Text blocks in the order the provider produced them
    #[serde(default)]
    pub blocks: Vec<String>,

    /// Native tool calls the model asked for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_requests: Vec<ToolInvocationRequest>,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// A single-block text response.
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            blocks: vec![text.into()],
            ..Self::default()
        }
    }

    pub fn with_tool_requests(mut self, requests: Vec<ToolInvocationRequest>) -> Self {
        self.tool_requests = requests;
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// All text blocks joined with a single space.
    pub fn content(&self) -> String {
        self.blocks.join(" ")
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One incremental event from a streaming provider.
///
/// Tool calls arrive as a start event, any number of argument fragments and a
/// stop event, all sharing the same `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta { text: String },
    ToolCallStart { index: usize, id: String, name: String },
    ToolCallDelta { index: usize, partial_json: String },
    ToolCallStop { index: usize },
    End { usage: Option<Usage> },
}

/// Receiver side of a provider stream.
pub type EventStream = tokio::sync::mpsc::Receiver<std::result::Result<StreamEvent, ProviderError>>;

/// Callbacks driven by a streaming model call.
///
/// `on_tool_request` fires only once a tool call is complete; partial argument
/// JSON is never exposed.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    async fn on_token(&self, token: &str);

    async fn on_tool_request(&self, _request: &ToolInvocationRequest) {}

    async fn on_complete(&self, _response: &CompletionResponse) {}

    async fn on_error(&self, _error: &ProviderError) {}
}

/// The core Provider trait.
///
/// The conversation calls `complete()` or `stream()` without knowing which
/// backend is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Whether the backend accepts tool definitions and returns structured
    /// tool calls. When false the inline `<tools>` protocol is used instead.
    fn supports_native_tools(&self) -> bool {
        false
    }

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;

    /// Send a request and get a stream of events.
    ///
    /// Default implementation calls `complete()` and replays the result as events.
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<EventStream, ProviderError> {
        let response = self.complete(request).await?;
        let mut events = Vec::new();
        let content = response.content();
        if !content.is_empty() {
            events.push(StreamEvent::TextDelta { text: content });
        }
        for (index, call) in response.tool_requests.iter().enumerate() {
            events.push(StreamEvent::ToolCallStart {
                index,
                id: call.id.clone(),
                name: call.tool.clone(),
            });
            events.push(StreamEvent::ToolCallDelta {
                index,
                partial_json: call.parameters.to_string(),
            });
            events.push(StreamEvent::ToolCallStop { index });
        }
        events.push(StreamEvent::End {
            usage: response.usage,
        });

        let (tx, rx) = tokio::sync::mpsc::channel(events.len());
        for event in events {
            let _ = tx.send(Ok(event)).await;
        }
        Ok(rx)
    }

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}
