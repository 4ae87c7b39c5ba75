//! Memory and chat-history store implementations for Convoy.

pub mod file_backend;
pub mod in_memory;
pub mod noop;
mod recall;

pub use file_backend::FileMemoryStore;
pub use in_memory::{InMemoryChatHistoryStore, InMemoryMemoryStore};
pub use noop::NoopMemory;
