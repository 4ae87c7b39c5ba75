//! Assistant-level status notifications.

use chrono::{DateTime, Utc};
use convoy_core::tool::{ToolState, ToolStatusUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantStatusKind {
    Chat,
    Tool,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantStatusState {
    Started,
    Working,
    Completed,
    Failed,
}

impl From<ToolState> for AssistantStatusState {
    fn from(state: ToolState) -> Self {
        match state {
            ToolState::Running => Self::Working,
            ToolState::Completed => Self::Completed,
            ToolState::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantStatus {
    pub kind: AssistantStatusKind,
    pub state: AssistantStatusState,
    pub title: String,
    pub message: String,
    pub assistant: String,
    pub timestamp: DateTime<Utc>,
}

impl AssistantStatus {
    pub fn new(
        kind: AssistantStatusKind,
        state: AssistantStatusState,
        title: impl Into<String>,
        message: impl Into<String>,
        assistant: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            state,
            title: title.into(),
            message: message.into(),
            assistant: assistant.into(),
            timestamp: Utc::now(),
        }
    }

    /// Map a tool status update onto an assistant status. The title names the tool.
    pub fn from_tool_update(update: &ToolStatusUpdate, assistant: impl Into<String>) -> Self {
        Self::new(
            AssistantStatusKind::Tool,
            update.state.into(),
            update.tool_id.clone(),
            update.message.clone(),
            assistant,
        )
    }
}

/// Receives every status an assistant emits.
pub type AssistantStatusCallback = Arc<dyn Fn(AssistantStatus) + Send + Sync>;
