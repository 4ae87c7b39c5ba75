//! Memory recall tool: lets the assistant search its stored memories on demand.

use async_trait::async_trait;
use convoy_core::error::ToolError;
use convoy_core::memory::MemoryStore;
use convoy_core::tool::{parse_input, to_output, Tool, ToolContext, ToolState};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct RecallInput {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Serialize)]
struct RecalledMemory {
    content: String,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct RecallOutput {
    memories: Vec<RecalledMemory>,
}

/// Searches a [`MemoryStore`] by keyword.
pub struct MemoryRecallTool {
    store: Arc<dyn MemoryStore>,
}

impl MemoryRecallTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryRecallTool {
    fn id(&self) -> &str {
        "memory_recall"
    }

    fn purpose(&self) -> &str {
        "Search remembered facts"
    }

    fn description(&self) -> &str {
        "Search your long-term memory for facts you were told or decided to remember earlier. \
         Use this when the answer may depend on something from a past conversation."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 50,
                    "description": "Maximum number of memories to return (default 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn exec(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<serde_json::Value, ToolError> {
        let input: RecallInput = parse_input(input)?;
        ctx.report(ToolState::Running, format!("Searching memories for '{}'", input.query));

        let memories = self
            .store
            .recall(&input.query)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.id().to_string(),
                reason: e.to_string(),
            })?;

        let memories = memories
            .into_iter()
            .take(input.limit)
            .map(|m| RecalledMemory {
                content: m.content,
                created_at: m.created_at.to_rfc3339(),
            })
            .collect();

        to_output(&RecallOutput { memories })
    }
}
