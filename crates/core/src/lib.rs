//! # Convoy Core
//!
//! Domain types, traits, and error definitions for the Convoy agent
//! orchestration core. This crate has **no transport or storage dependencies**; it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is defined as a trait here: [`Provider`], [`Tool`],
//! [`MemoryStore`], [`ChatHistoryStore`]. Implementations live in their
//! respective crates, and tests swap in scripted stand-ins.

pub mod error;
pub mod history;
pub mod memory;
pub mod message;
pub mod options;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, ToolError, ToolParseError};
pub use history::ChatHistoryStore;
pub use memory::{Memory, MemoryStore};
pub use message::{Message, Role, SessionId, Thread};
pub use options::GenerationOptions;
pub use provider::{
    CompletionRequest, CompletionResponse, EventStream, Provider, StreamEvent, StreamHandler,
    ToolDefinition, Usage,
};
pub use tool::{
    StatusReporter, Tool, ToolContext, ToolExample, ToolInvocationRequest, ToolRegistry,
    ToolResult, ToolState, ToolStatusUpdate,
};
