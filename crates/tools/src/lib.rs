//! Built-in tool implementations for Convoy.
//!
//! Small, dependency-free tools that are useful in almost every assistant:
//! exact arithmetic, the current time, and recall of stored memories.

pub mod arithmetic;
pub mod clock;
pub mod memory_recall;

use convoy_core::memory::MemoryStore;
use convoy_core::tool::ToolRegistry;
use std::sync::Arc;

pub use arithmetic::ArithmeticTool;
pub use clock::ClockTool;
pub use memory_recall::MemoryRecallTool;

/// Create a tool registry with all built-in tools.
///
/// `memory_recall` searches `memories`.
pub fn default_registry(memories: Arc<dyn MemoryStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ArithmeticTool));
    registry.register(Box::new(ClockTool));
    registry.register(Box::new(MemoryRecallTool::new(memories)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_memory::NoopMemory;

    #[test]
    fn default_registry_has_builtins() {
        let registry = default_registry(Arc::new(NoopMemory));
        assert_eq!(registry.ids(), vec!["arithmetic", "clock", "memory_recall"]);
        assert!(registry.definitions().iter().all(|d| !d.description.is_empty()));
    }
}
