//! In-memory stores: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use convoy_core::error::MemoryError;
use convoy_core::history::ChatHistoryStore;
use convoy_core::memory::{Memory, MemoryStore};
use convoy_core::message::{Message, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::recall::keyword_recall;

/// An in-memory memory store that keeps memories in a Vec.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryMemoryStore {
    entries: Arc<RwLock<Vec<Memory>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn store(&self, memory: Memory) -> Result<(), MemoryError> {
        self.entries.write().await.push(memory);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Memory>, MemoryError> {
        Ok(self.entries.read().await.clone())
    }

    async fn recall(&self, prompt: &str) -> Result<Vec<Memory>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(keyword_recall(&entries, prompt))
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Per-session message history held in a HashMap.
pub struct InMemoryChatHistoryStore {
    sessions: Arc<RwLock<HashMap<SessionId, Vec<Message>>>>,
}

impl InMemoryChatHistoryStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryChatHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatHistoryStore for InMemoryChatHistoryStore {
    async fn store(&self, session: &SessionId, message: Message) -> Result<(), MemoryError> {
        self.sessions
            .write()
            .await
            .entry(session.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn history(&self, session: &SessionId, max_len: usize) -> Result<Vec<Message>, MemoryError> {
        let sessions = self.sessions.read().await;
        let Some(messages) = sessions.get(session) else {
            return Ok(Vec::new());
        };
        let skip = messages.len().saturating_sub(max_len);
        Ok(messages[skip..].to_vec())
    }

    async fn clear(&self, session: &SessionId) -> Result<(), MemoryError> {
        self.sessions.write().await.remove(session);
        Ok(())
    }

    async fn remove(&self, session: &SessionId, message_ids: &[String]) -> Result<(), MemoryError> {
        if let Some(messages) = self.sessions.write().await.get_mut(session) {
            messages.retain(|m| !message_ids.contains(&m.id));
        }
        Ok(())
    }

    async fn session_ids(&self) -> Result<Vec<SessionId>, MemoryError> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ids)
    }

    async fn token_count(&self, session: &SessionId) -> Result<usize, MemoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session)
            .map(|messages| {
                messages
                    .iter()
                    .map(|m| m.content.split_whitespace().count())
                    .sum()
            })
            .unwrap_or(0))
    }
}
