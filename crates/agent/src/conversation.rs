//! The conversation loop.
//!
//! One [`Conversation`] owns one [`Thread`]. Each call to [`Conversation::send`]
//! runs the loop below until the model produces a final answer:
//!
//! 1. **Enter**: fail if the round-trip depth is past the bound, otherwise
//!    append the incoming message.
//! 2. **Call the model**: streamed or not.
//! 3. **Post-process**: strip and store memories, append the assistant reply.
//! 4. **Native tool calls**: run them, reply with a summary, go again.
//! 5. **Inline `<tools>` / `<tool_help>`**: run or answer, reply, go again.
//! 6. **Done**: return the assistant reply.
//!
//! Provider errors, the depth bound and cancellation end the call with an
//! error. Anything that goes wrong in steps 3 to 5 is logged and answered
//! with a fixed apology instead.

use convoy_core::error::{Error, Result};
use convoy_core::history::ChatHistoryStore;
use convoy_core::memory::MemoryStore;
use convoy_core::message::{Message, Role, SessionId, Thread};
use convoy_core::options::GenerationOptions;
use convoy_core::provider::{CompletionRequest, CompletionResponse, Provider, StreamHandler};
use convoy_core::tool::{StatusReporter, ToolRegistry, ToolResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::memory_processor::MemoryProcessor;
use crate::stream::{StreamOutcome, stream_complete};
use crate::tool_processor::ToolProcessor;

/// Reply used when a model response cannot be processed.
pub const PROCESSING_APOLOGY: &str = "I'm sorry, I'm having trouble processing that request.";

/// Default bound on tool round-trips per `send`.
pub const DEFAULT_MAX_DEPTH: usize = 15;

enum Step {
    Done(Message),
    Continue(Message),
}

struct HistorySink {
    store: Arc<dyn ChatHistoryStore>,
    session: SessionId,
}

pub struct Conversation {
    provider: Arc<dyn Provider>,
    tools: ToolProcessor,
    memory: Option<MemoryProcessor>,
    history: Option<HistorySink>,
    thread: Thread,
    model: String,
    system_prompt: Option<String>,
    options: GenerationOptions,
    max_depth: usize,
    tool_status: Option<StatusReporter>,
}

impl Conversation {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools: ToolProcessor::new(tools),
            memory: None,
            history: None,
            thread: Thread::new(),
            model: "default".into(),
            system_prompt: None,
            options: GenerationOptions::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            tool_status: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Maximum number of tool round-trips per `send`.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Seed the thread, typically with stored history.
    pub fn with_thread(mut self, thread: Thread) -> Self {
        self.thread = thread;
        self
    }

    /// Extract `<memory>` spans from replies into `store`.
    pub fn with_memory(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(MemoryProcessor::new(store));
        self
    }

    /// Record every appended message in `store` under `session`.
    pub fn with_history(mut self, store: Arc<dyn ChatHistoryStore>, session: SessionId) -> Self {
        self.history = Some(HistorySink { store, session });
        self
    }

    pub fn with_tool_status(mut self, status: StatusReporter) -> Self {
        self.tool_status = Some(status);
        self
    }

    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Send `message` and run the loop to a final assistant reply.
    pub async fn send(&mut self, message: Message) -> Result<Message> {
        self.run(message, None).await
    }

    /// Like [`send`](Self::send), but model calls are streamed to `handler`.
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires mid-stream; the cancelled
    /// reply is not appended.
    pub async fn send_streaming(
        &mut self,
        message: Message,
        handler: &dyn StreamHandler,
        cancel: &CancellationToken,
    ) -> Result<Message> {
        self.run(message, Some((handler, cancel))).await
    }

    async fn run(
        &mut self,
        message: Message,
        stream: Option<(&dyn StreamHandler, &CancellationToken)>,
    ) -> Result<Message> {
        let mut depth = 0usize;
        let mut incoming = message;

        loop {
            if depth > self.max_depth {
                warn!(depth, max_depth = self.max_depth, "Conversation depth exceeded");
                return Err(Error::DepthExceeded {
                    max_depth: self.max_depth,
                });
            }
            self.append(incoming).await;

            let request = self.build_request();
            info!(
                provider = self.provider.name(),
                model = %request.model,
                messages = request.messages.len(),
                depth,
                streaming = stream.is_some(),
                "Calling model"
            );

            let response = match stream {
                Some((handler, cancel)) => {
                    match stream_complete(self.provider.as_ref(), request, handler, cancel).await? {
                        StreamOutcome::Completed(response) => response,
                        StreamOutcome::Cancelled => return Err(Error::Cancelled),
                    }
                }
                None => self.provider.complete(request).await?,
            };

            match self.post_process(response).await {
                Ok(Step::Done(reply)) => return Ok(reply),
                Ok(Step::Continue(next)) => {
                    incoming = next;
                    depth += 1;
                }
                Err(e) => {
                    error!(error = %e, depth, "Failed to process model response");
                    let apology = Message::assistant(PROCESSING_APOLOGY);
                    self.append(apology.clone()).await;
                    return Ok(apology);
                }
            }
        }
    }

    fn build_request(&self) -> CompletionRequest {
        let messages = self
            .thread
            .messages()
            .iter()
            .filter(|m| m.role != Role::Debug)
            .cloned()
            .collect();

        let mut request =
            CompletionRequest::new(&self.model, messages).with_options(self.options.clone());
        if let Some(prompt) = &self.system_prompt {
            request = request.with_system_prompt(prompt);
        }
        if self.provider.supports_native_tools() {
            request = request.with_tools(self.tools.tools().definitions());
        }
        request
    }

    async fn post_process(&mut self, response: CompletionResponse) -> Result<Step> {
        let raw = response.content();
        let cleaned = match &self.memory {
            Some(memory) if MemoryProcessor::should_process(&raw) => {
                memory.extract_memories(&raw).await?
            }
            _ => raw,
        };

        let reply = Message::assistant(cleaned).with_tool_requests(response.tool_requests);
        self.append(reply.clone()).await;

        if reply.has_tool_requests() {
            debug!(count = reply.tool_requests.len(), "Running native tool calls");
            let results = self
                .tools
                .process(reply.tool_requests.clone(), self.tool_status.clone())
                .await;
            let summary = results.iter().map(summary_line).collect::<Vec<_>>().join("\n\n");
            return Ok(Step::Continue(Message::user(summary).with_tool_results(results)));
        }

        let wants_tools = ToolProcessor::has_tool_request(&reply.content);
        let wants_help = ToolProcessor::has_help_request(&reply.content);
        if !wants_tools && !wants_help {
            return Ok(Step::Done(reply));
        }

        let mut sections = Vec::new();
        let mut results = Vec::new();

        if wants_tools {
            results = match self
                .tools
                .extract_and_process(&reply.content, self.tool_status.clone())
                .await
            {
                Ok(results) => results,
                Err(e) => {
                    warn!(error = %e, block = %e.block, "Malformed tools block");
                    vec![ToolResult::failure(
                        Uuid::new_v4().to_string(),
                        "tools",
                        format!("{} (block: {})", e.message, e.block),
                    )]
                }
            };
            sections.push(render_results(&results)?);
        }

        if wants_help {
            sections.push(self.tools.process_help(&reply.content));
        }

        Ok(Step::Continue(
            Message::user(sections.join("\n\n")).with_tool_results(results),
        ))
    }

    async fn append(&mut self, message: Message) {
        if let Some(sink) = &self.history
            && let Err(e) = sink.store.store(&sink.session, message.clone()).await
        {
            warn!(session = %sink.session, error = %e, "Failed to record message in history");
        }
        self.thread.push(message);
    }
}

fn summary_line(result: &ToolResult) -> String {
    if result.success {
        format!(" * {} executed successfully.", result.tool)
    } else {
        format!(
            " * {} executed with the following error: {}",
            result.tool,
            result.error.as_deref().unwrap_or_default()
        )
    }
}

fn render_results(results: &[ToolResult]) -> Result<String> {
    let blocks = results
        .iter()
        .map(|r| Ok(format!("<tool_result>\n{}\n</tool_result>", serde_json::to_string(r)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(blocks.join("\n\n"))
}
