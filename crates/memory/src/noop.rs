//! No-op memory store: disables memories entirely.

use async_trait::async_trait;
use convoy_core::error::MemoryError;
use convoy_core::memory::{Memory, MemoryStore};

/// A no-op memory store that remembers nothing.
pub struct NoopMemory;

#[async_trait]
impl MemoryStore for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }

    async fn store(&self, _memory: Memory) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Memory>, MemoryError> {
        Ok(Vec::new())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        Ok(())
    }
}
