//! Memory trait: facts the assistant decided to remember.
//!
//! Memories are harvested from `<memory>` spans in model output and replayed
//! into later system prompts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// A single remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// The content of the memory
    pub content: String,

    /// When this memory was created
    pub created_at: DateTime<Utc>,
}

impl Memory {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// The core MemoryStore trait.
///
/// Implementations: in-memory, JSONL file, none (no-op).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The store name (e.g., "in_memory", "file", "none").
    fn name(&self) -> &str;

    /// Store a new memory.
    async fn store(&self, memory: Memory) -> std::result::Result<(), MemoryError>;

    /// All memories, oldest first.
    async fn all(&self) -> std::result::Result<Vec<Memory>, MemoryError>;

    /// Memories relevant to `prompt`.
    ///
    /// Default implementation returns everything.
    async fn recall(&self, _prompt: &str) -> std::result::Result<Vec<Memory>, MemoryError> {
        self.all().await
    }

    /// Clear all memories.
    async fn clear(&self) -> std::result::Result<(), MemoryError>;
}
