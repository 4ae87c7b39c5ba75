//! The assistant façade: configuration, history and memory around a
//! [`Conversation`].

use convoy_config::{AppConfig, AssistantConfig};
use convoy_core::error::{Error, Result};
use convoy_core::history::ChatHistoryStore;
use convoy_core::memory::{Memory, MemoryStore};
use convoy_core::message::{Message, SessionId, Thread};
use convoy_core::options::GenerationOptions;
use convoy_core::provider::{Provider, StreamHandler};
use convoy_core::tool::{StatusReporter, ToolRegistry, ToolStatusUpdate};
use convoy_memory::InMemoryChatHistoryStore;
use convoy_providers::{RetryPolicy, RetryingProvider};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::conversation::Conversation;
use crate::memory_processor::render_memories;
use crate::response_buffer::FilteredHandler;
use crate::status::{
    AssistantStatus, AssistantStatusCallback, AssistantStatusKind, AssistantStatusState,
};
use crate::system_prompt::{SystemPromptContext, build_system_prompt};

pub struct Assistant {
    config: AssistantConfig,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    memory: Option<Arc<dyn MemoryStore>>,
    history: Arc<dyn ChatHistoryStore>,
    options: GenerationOptions,
    filter_markers: bool,
    status: Option<AssistantStatusCallback>,
}

impl Assistant {
    /// An assistant with default settings and in-memory chat history.
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config: AssistantConfig::default(),
            provider,
            tools,
            memory: None,
            history: Arc::new(InMemoryChatHistoryStore::new()),
            options: GenerationOptions::default(),
            filter_markers: true,
            status: None,
        }
    }

    /// Build an assistant from loaded configuration.
    ///
    /// `provider` is wrapped in a [`RetryingProvider`] that retries transient
    /// failures according to `[retry]`.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        let policy = RetryPolicy::from_config(&config.retry)
            .with_should_retry(convoy_core::ProviderError::is_retryable);
        let provider: Arc<dyn Provider> = Arc::new(RetryingProvider::new(provider, policy));

        Self {
            config: config.assistant.clone(),
            options: config.generation.clone(),
            filter_markers: config.streaming.filter_markers,
            ..Self::new(provider, tools)
        }
    }

    pub fn with_memory(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(store);
        self
    }

    pub fn with_history(mut self, store: Arc<dyn ChatHistoryStore>) -> Self {
        self.history = store;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_status(mut self, callback: AssistantStatusCallback) -> Self {
        self.status = Some(callback);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn greeting(&self) -> &str {
        &self.config.greeting
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// One user turn in `session`, with stored history and memory.
    pub async fn chat(&self, session: &SessionId, text: &str) -> Result<Message> {
        let mut conversation = self.session_conversation(session).await?;
        self.emit(AssistantStatusKind::Chat, AssistantStatusState::Started, "Thinking");

        let outcome = conversation.send(Message::user(text)).await;
        self.finish_turn(session, &outcome);
        outcome
    }

    /// Like [`chat`](Self::chat), streaming tokens to `handler`.
    ///
    /// Control markup is filtered from the tokens unless
    /// `streaming.filter_markers` is off.
    pub async fn chat_streaming(
        &self,
        session: &SessionId,
        text: &str,
        handler: Arc<dyn StreamHandler>,
        cancel: &CancellationToken,
    ) -> Result<Message> {
        let mut conversation = self.session_conversation(session).await?;
        self.emit(AssistantStatusKind::Chat, AssistantStatusState::Started, "Thinking");

        let handler: Arc<dyn StreamHandler> = if self.filter_markers {
            Arc::new(FilteredHandler::new(handler))
        } else {
            handler
        };

        let outcome = conversation
            .send_streaming(Message::user(text), handler.as_ref(), cancel)
            .await;
        self.finish_turn(session, &outcome);
        outcome
    }

    /// A single-shot completion without history or memory.
    ///
    /// `options` override the assistant's defaults field by field.
    pub async fn generate(&self, prompt: &str, options: Option<&GenerationOptions>) -> Result<Message> {
        let options = match options {
            Some(over) => self.options.override_with(over),
            None => self.options.clone(),
        };
        let system_prompt = build_system_prompt(&self.prompt_context(None));

        let mut conversation = self
            .conversation(system_prompt, Thread::new())
            .with_options(options);
        conversation.send(Message::user(prompt)).await
    }

    /// Everything in the memory store, or nothing without one.
    pub async fn memories(&self) -> Result<Vec<Memory>> {
        match &self.memory {
            Some(store) => Ok(store.all().await?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn clear_history(&self, session: &SessionId) -> Result<()> {
        self.history.clear(session).await?;
        info!(session = %session, "Cleared chat history");
        Ok(())
    }

    pub async fn delete_messages(&self, session: &SessionId, message_ids: &[String]) -> Result<()> {
        self.history.remove(session, message_ids).await?;
        debug!(session = %session, count = message_ids.len(), "Deleted messages");
        Ok(())
    }

    async fn session_conversation(&self, session: &SessionId) -> Result<Conversation> {
        let history = self.history.history(session, self.config.history_length).await?;

        let memories = match &self.memory {
            Some(store) => Some(render_memories(&store.all().await?)),
            None => None,
        };
        let system_prompt = build_system_prompt(&self.prompt_context(memories));

        let mut conversation = self
            .conversation(system_prompt, Thread::seeded(history))
            .with_history(self.history.clone(), session.clone());
        if let Some(store) = &self.memory {
            conversation = conversation.with_memory(store.clone());
        }
        Ok(conversation)
    }

    fn conversation(&self, system_prompt: String, thread: Thread) -> Conversation {
        let mut conversation = Conversation::new(self.provider.clone(), self.tools.clone())
            .with_model(&self.config.model)
            .with_system_prompt(system_prompt)
            .with_options(self.options.clone())
            .with_max_depth(self.config.max_thread_depth)
            .with_thread(thread);

        if let Some(callback) = &self.status {
            let callback = callback.clone();
            let name = self.config.name.clone();
            let reporter: StatusReporter = Arc::new(move |update: ToolStatusUpdate| {
                callback(AssistantStatus::from_tool_update(&update, name.clone()));
            });
            conversation = conversation.with_tool_status(reporter);
        }
        conversation
    }

    fn prompt_context(&self, memories: Option<String>) -> SystemPromptContext {
        let inline_tools = if self.provider.supports_native_tools() {
            Vec::new()
        } else {
            self.tools.definitions()
        };

        let mut ctx = SystemPromptContext::new(&self.config.name)
            .with_inline_tools(inline_tools)
            .with_instructions(self.config.instructions.clone())
            .with_persona(self.config.persona.clone());
        if let Some(memories) = memories {
            ctx = ctx.with_memories(memories);
        }
        ctx
    }

    fn finish_turn(&self, session: &SessionId, outcome: &Result<Message>) {
        match outcome {
            Ok(_) => {
                debug!(session = %session, "Turn completed");
                self.emit(AssistantStatusKind::Chat, AssistantStatusState::Completed, "Done");
            }
            Err(Error::Cancelled) => {
                self.emit(AssistantStatusKind::Chat, AssistantStatusState::Failed, "Cancelled");
            }
            Err(e) => {
                self.emit(AssistantStatusKind::Chat, AssistantStatusState::Failed, e.to_string());
            }
        }
    }

    fn emit(&self, kind: AssistantStatusKind, state: AssistantStatusState, message: impl Into<String>) {
        if let Some(callback) = &self.status {
            callback(AssistantStatus::new(kind, state, self.config.name.clone(), message, self.config.name.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, make_text_response, make_tool_call_response};
    use convoy_core::message::Role;
    use convoy_core::tool::ToolInvocationRequest;
    use convoy_memory::InMemoryMemoryStore;
    use convoy_tools::ArithmeticTool;
    use serde_json::json;
    use std::sync::Mutex;

    fn tools() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(ArithmeticTool));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn chat_replays_history_across_turns() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("Hello Sam"),
            make_text_response("You are Sam"),
        ]));
        let assistant = Assistant::new(provider.clone(), tools());
        let session = SessionId::from("s");

        assistant.chat(&session, "I'm Sam").await.unwrap();
        let reply = assistant.chat(&session, "Who am I?").await.unwrap();
        assert_eq!(reply.content, "You are Sam");

        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[0].content, "I'm Sam");
    }

    #[tokio::test]
    async fn system_prompt_describes_inline_tools_for_plain_providers() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("ok")]));
        let assistant = Assistant::new(provider.clone(), tools());
        assistant.chat(&SessionId::default(), "hi").await.unwrap();

        let prompt = provider.requests()[0].system_prompt.clone().unwrap();
        assert!(prompt.contains("You are Convoy"));
        assert!(prompt.contains("* arithmetic:"));
        assert!(!prompt.contains("<memory_instructions>"));
    }

    #[tokio::test]
    async fn native_providers_get_definitions_not_catalogue() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("ok")]).native());
        let assistant = Assistant::new(provider.clone(), tools());
        assistant.chat(&SessionId::default(), "hi").await.unwrap();

        let request = &provider.requests()[0];
        assert!(!request.system_prompt.as_deref().unwrap().contains("<available_tools>"));
        assert_eq!(request.tools.len(), 1);
    }

    #[tokio::test]
    async fn chat_stores_memories_and_shows_them_next_turn() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("Nice!<memory>likes tea</memory>"),
            make_text_response("Tea"),
        ]));
        let store = Arc::new(InMemoryMemoryStore::new());
        let assistant = Assistant::new(provider.clone(), tools()).with_memory(store);
        let session = SessionId::default();

        let first = assistant.chat(&session, "I like tea").await.unwrap();
        assert_eq!(first.content, "Nice!");
        assistant.chat(&session, "What do I like?").await.unwrap();

        assert_eq!(assistant.memories().await.unwrap().len(), 1);
        let prompt = provider.requests()[1].system_prompt.clone().unwrap();
        assert!(prompt.contains("<memory>likes tea</memory>"));
    }

    #[tokio::test]
    async fn generate_skips_history_and_merges_options() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("short")]));
        let assistant = Assistant::new(provider.clone(), tools())
            .with_options(GenerationOptions::standard());

        let over = GenerationOptions::default().with_max_tokens(10);
        assistant.generate("Summarise", Some(&over)).await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.options.max_tokens, Some(10));
        assert_eq!(request.options.temperature, Some(0.7));
        assert!(assistant.history.session_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_and_delete_history() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("one"),
            make_text_response("two"),
        ]));
        let assistant = Assistant::new(provider, tools());
        let session = SessionId::from("s");

        let reply = assistant.chat(&session, "a").await.unwrap();
        assistant.delete_messages(&session, &[reply.id]).await.unwrap();
        let left = assistant.history.history(&session, 10).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].role, Role::User);

        assistant.clear_history(&session).await.unwrap();
        assert!(assistant.history.history(&session, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tool_status_is_mapped_to_assistant_status() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![
                make_tool_call_response(
                    vec![ToolInvocationRequest::new("arithmetic", json!({"operation": "add", "a": 1, "b": 2}))],
                    "",
                ),
                make_text_response("3"),
            ])
            .native(),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let assistant = Assistant::new(provider, tools())
            .with_status(Arc::new(move |s: AssistantStatus| sink.lock().unwrap().push((s.kind, s.state))));

        assistant.chat(&SessionId::default(), "1+2").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (AssistantStatusKind::Chat, AssistantStatusState::Started),
                (AssistantStatusKind::Tool, AssistantStatusState::Working),
                (AssistantStatusKind::Tool, AssistantStatusState::Completed),
                (AssistantStatusKind::Chat, AssistantStatusState::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn from_config_applies_assistant_section() {
        let mut config = AppConfig::default();
        config.assistant.name = "Ada".into();
        config.assistant.greeting = "Hi!".into();
        config.assistant.model = "small".into();

        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("ok")]));
        let assistant = Assistant::from_config(&config, provider.clone(), tools());
        assert_eq!(assistant.greeting(), "Hi!");

        assistant.chat(&SessionId::default(), "hi").await.unwrap();
        let request = &provider.requests()[0];
        assert_eq!(request.model, "small");
        assert!(request.system_prompt.as_deref().unwrap().contains("You are Ada"));
    }
}
