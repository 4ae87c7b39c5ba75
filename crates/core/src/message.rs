//! Message and Thread domain types.
//!
//! These are the core value objects that flow through the entire system:
//! the user sends a message → the conversation appends it to its thread →
//! the provider answers → tool results are folded back in as new messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::{ToolInvocationRequest, ToolResult};

/// Identifier of a chat session in a history store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::from("default")
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user, or a synthesized tool-result reply
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
    /// Diagnostic output never sent to a provider
    Debug,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Debug => "debug",
        };
        f.write_str(s)
    }
}

/// A single message in a conversation.
///
/// Messages are built once (constructor plus `with_*` builders) and are not
/// mutated after being appended to a [`Thread`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Tools the assistant asked for (native tool calling)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_requests: Vec<ToolInvocationRequest>,

    /// Results carried by a synthesized tool-result reply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_requests: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a new debug message.
    pub fn debug(content: impl Into<String>) -> Self {
        Self::with_role(Role::Debug, content)
    }

    /// Attach the tool invocations the assistant requested.
    pub fn with_tool_requests(mut self, requests: Vec<ToolInvocationRequest>) -> Self {
        self.tool_requests = requests;
        self
    }

    /// Attach tool results to a synthesized reply.
    pub fn with_tool_results(mut self, results: Vec<ToolResult>) -> Self {
        self.tool_results = results;
        self
    }

    /// Override the creation timestamp (used when replaying stored history).
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn has_tool_requests(&self) -> bool {
        !self.tool_requests.is_empty()
    }
}

/// The ordered, append-only message history of one exchange.
///
/// A thread is seeded from persisted history and then only grows. The seeded
/// length is remembered so callers can tell history from in-flight messages.
#[derive(Debug, Clone, Default)]
pub struct Thread {
    messages: Vec<Message>,
    seeded_len: usize,
}

impl Thread {
    /// Create an empty thread.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a thread seeded with prior history.
    pub fn seeded(history: Vec<Message>) -> Self {
        let seeded_len = history.len();
        Self {
            messages: history,
            seeded_len,
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn seeded_len(&self) -> usize {
        self.seeded_len
    }

    /// Messages appended since the thread was seeded.
    pub fn growth(&self) -> usize {
        self.messages.len() - self.seeded_len
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Rough token estimate (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}
