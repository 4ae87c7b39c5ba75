//! Chat history persistence contract.

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::message::{Message, SessionId};

/// Storage for per-session message history.
///
/// Only the interface and an in-memory implementation ship with Convoy;
/// durable backends plug in behind this trait.
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    /// Append a message to a session.
    async fn store(&self, session: &SessionId, message: Message) -> std::result::Result<(), MemoryError>;

    /// Up to `max_len` of the most recent messages of a session, oldest first.
    async fn history(
        &self,
        session: &SessionId,
        max_len: usize,
    ) -> std::result::Result<Vec<Message>, MemoryError>;

    /// Drop every message of a session.
    async fn clear(&self, session: &SessionId) -> std::result::Result<(), MemoryError>;

    /// Remove the given message ids from a session. Unknown ids are ignored.
    async fn remove(&self, session: &SessionId, message_ids: &[String]) -> std::result::Result<(), MemoryError>;

    /// All sessions with stored messages.
    async fn session_ids(&self) -> std::result::Result<Vec<SessionId>, MemoryError>;

    /// Approximate token count of a session (whitespace-separated words).
    async fn token_count(&self, session: &SessionId) -> std::result::Result<usize, MemoryError>;
}
