//! The Convoy agent: a conversation loop that lets a model call tools.
//!
//! A user message enters a [`Conversation`], the model answers, and the
//! answer is inspected:
//!
//! - native tool calls or inline `<tools>` blocks are run by the
//!   [`ToolProcessor`] and the results are sent back to the model;
//! - `<tool_help tool_id="…"/>` markers are answered with tool instructions;
//! - `<memory>` spans are stored by the [`MemoryProcessor`] and stripped;
//! - anything else is the final answer.
//!
//! [`Assistant`] wraps a conversation with configuration, chat history,
//! memory and the system prompt.

pub mod assistant;
pub mod conversation;
pub mod json_extract;
pub mod memory_processor;
pub mod response_buffer;
pub mod status;
pub mod stream;
pub mod system_prompt;
pub mod tool_processor;

#[cfg(test)]
mod test_helpers;

pub use assistant::Assistant;
pub use conversation::{Conversation, DEFAULT_MAX_DEPTH, PROCESSING_APOLOGY};
pub use json_extract::{JsonExtractError, JsonStage, extract_json};
pub use memory_processor::MemoryProcessor;
pub use response_buffer::{FilteredHandler, MarkerPair, ResponseBuffer, default_markers};
pub use status::{AssistantStatus, AssistantStatusCallback, AssistantStatusKind, AssistantStatusState};
pub use stream::{Accumulated, StreamAccumulator, StreamOutcome, stream_complete};
pub use system_prompt::{InfoBit, SystemPromptContext, build_system_prompt};
pub use tool_processor::{NO_TOOLS_REQUESTED, ToolProcessor};
